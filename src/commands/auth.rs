use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use crate::api::AuthApi;
use crate::auth::AuthController;
use crate::guard;
use crate::session::Session;

pub async fn login<A: AuthApi>(
    auth: &mut AuthController<A>,
    username: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => read_password()?,
    };

    let outcome = auth.login(username, &password).await?;
    println!(
        "Logged in as {}",
        outcome.session.username.as_deref().unwrap_or(username)
    );
    println!("Next: {}", outcome.redirect);
    Ok(())
}

pub async fn signup<A: AuthApi>(
    auth: &mut AuthController<A>,
    username: &str,
    name: &str,
    email: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => read_password()?,
    };

    let outcome = auth.register(username, name, email, &password).await?;
    println!(
        "Account created for {}",
        outcome.session.username.as_deref().unwrap_or(username)
    );
    println!("Next: {}", outcome.redirect);
    Ok(())
}

pub fn logout<A: AuthApi>(auth: &mut AuthController<A>) -> Result<()> {
    let next = auth.logout()?;
    println!("Logged out");
    println!("Next: {}", next);
    Ok(())
}

pub fn whoami(session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    println!(
        "Logged in as {}",
        session.username.as_deref().unwrap_or("(unknown user)")
    );
    if let Some(at) = session.logged_in_at {
        println!("Since: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Jobs: {}", guard::jobs_link(session));
    Ok(())
}

fn read_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
