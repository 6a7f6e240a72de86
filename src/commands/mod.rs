pub mod auth;
pub mod contact;
pub mod create;
pub mod delete;
pub mod list;
pub mod open;
pub mod show;
pub mod status;
pub mod update;

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use tracing::debug;

use crate::api::JobsApi;
use crate::guard::{self, Access, Route};
use crate::session::Session;
use crate::sync::JobsEngine;

pub const NOT_LOGGED_IN: &str = "Not logged in. Run 'jobtrack login' first.";

/// Mounts the jobs view for `user` (or the session's user): runs the route
/// guard, then loads the list. A redirect never touches the network.
pub async fn mount<G: JobsApi>(api: G, session: &Session, user: Option<&str>) -> Result<JobsEngine<G>> {
    let username = guard::resolve_username(user, session).unwrap_or_default();
    let route = Route::jobs(username.clone());
    if let Access::Redirect(target) = guard::check(session, &route) {
        debug!(from = %route, to = %target, "redirected by route guard");
        bail!(NOT_LOGGED_IN);
    }

    let engine = JobsEngine::new(api);
    engine.load(&username).await?;
    Ok(engine)
}

/// Converts a 1-based row or position from the command line.
pub(crate) fn index(row: usize) -> Result<usize> {
    row.checked_sub(1).context("Rows and positions start at 1")
}

pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
