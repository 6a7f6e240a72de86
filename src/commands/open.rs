use anyhow::{anyhow, Result};

use crate::guard::{self, Access, Route};
use crate::session::Session;

/// Prints what navigating to `path` would do for the current session.
pub fn run(session: &Session, path: &str) -> Result<()> {
    let route: Route = path.parse().map_err(|e: String| anyhow!(e))?;
    match guard::check(session, &route) {
        Access::Render => println!("{}", route),
        Access::Redirect(target) => println!("{} -> {}", route, target),
    }
    Ok(())
}
