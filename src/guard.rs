//! Routes and the access check in front of the jobs view.

use std::fmt;
use std::str::FromStr;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    About,
    Login,
    Signup,
    /// `/{username}/jobs`. An empty username is allowed and resolved later.
    Jobs { username: String },
}

impl Route {
    pub fn jobs(username: impl Into<String>) -> Self {
        Route::Jobs {
            username: username.into(),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Jobs { .. })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::About => f.write_str("/about"),
            Route::Login => f.write_str("/login"),
            Route::Signup => f.write_str("/signup"),
            Route::Jobs { username } => write!(f, "/{}/jobs", username),
        }
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Ok(Route::Home),
            ["about"] => Ok(Route::About),
            ["login"] => Ok(Route::Login),
            ["signup"] => Ok(Route::Signup),
            [username, "jobs"] => Ok(Route::jobs(*username)),
            _ => Err(format!("No route matches '{}'", path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Render,
    Redirect(Route),
}

/// Decides whether `route` may render for `session`.
///
/// Evaluated on every navigation; nothing is cached.
pub fn check(session: &Session, route: &Route) -> Access {
    if route.is_protected() && !session.is_authenticated() {
        return Access::Redirect(Route::Login);
    }
    Access::Render
}

/// Username the jobs view acts for: the route parameter if present, else
/// the session username, else `None`.
pub fn resolve_username(route_param: Option<&str>, session: &Session) -> Option<String> {
    route_param
        .filter(|s| !s.is_empty())
        .or(session.username.as_deref().filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// Target of the navigation bar's "Jobs" link.
pub fn jobs_link(session: &Session) -> Route {
    match (&session.username, session.is_authenticated()) {
        (Some(username), true) if !username.is_empty() => Route::jobs(username.clone()),
        _ => Route::Login,
    }
}
