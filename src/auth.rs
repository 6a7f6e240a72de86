//! Login, signup and logout flows.

use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, AuthApi, AuthResponse, LoginRequest, SignupRequest};
use crate::db::StorageError;
use crate::guard::Route;
use crate::session::{Session, SessionStore};

pub const MIN_PASSWORD_LEN: usize = 6;

const LOGIN_FALLBACK: &str = "Login Failed";
const SIGNUP_FALLBACK: &str = "Signup failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the credentials or the signup.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("{}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A successful login or signup and where to navigate next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub session: Session,
    pub redirect: Route,
}

pub fn validate_login(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    errors
}

pub fn validate_signup(username: &str, name: &str, email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !email_regex().is_match(email.trim()) {
        errors.push(FieldError::new("email", "Invalid email format"));
    }
    if username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Minimum {} characters", MIN_PASSWORD_LEN),
        ));
    }
    errors
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex")
    })
}

pub struct AuthController<A> {
    api: A,
    session: Arc<SessionStore>,
    error: Option<String>,
    field_errors: Vec<FieldError>,
}

impl<A: AuthApi> AuthController<A> {
    pub fn new(api: A, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            error: None,
            field_errors: Vec::new(),
        }
    }

    /// Banner message from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Inline messages from the last failed validation.
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        self.field_errors = validate_login(username, password);
        if !self.field_errors.is_empty() {
            return Err(AuthError::Validation(self.field_errors.clone()));
        }

        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let result = self.api.login(&request).await;
        self.complete(result, &request.username, LOGIN_FALLBACK)
    }

    pub async fn register(
        &mut self,
        username: &str,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, AuthError> {
        self.field_errors = validate_signup(username, name, email, password);
        if !self.field_errors.is_empty() {
            return Err(AuthError::Validation(self.field_errors.clone()));
        }

        let request = SignupRequest {
            username: username.trim().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let result = self.api.signup(&request).await;
        self.complete(result, &request.username, SIGNUP_FALLBACK)
    }

    /// Ends the session and returns the route to show next.
    pub fn logout(&mut self) -> Result<Route, AuthError> {
        self.session.clear()?;
        self.error = None;
        self.field_errors.clear();
        Ok(Route::Login)
    }

    fn complete(
        &mut self,
        result: Result<AuthResponse, ApiError>,
        submitted_username: &str,
        fallback: &str,
    ) -> Result<AuthOutcome, AuthError> {
        let response = match result {
            Ok(response) => response,
            Err(source) => {
                let message = source.message_or(fallback);
                warn!(error = %source, "authentication rejected");
                self.error = Some(message.clone());
                return Err(AuthError::Rejected { message, source });
            }
        };

        let username = response
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| submitted_username.to_string());
        let session = self.session.set(&response.token, &username)?;
        self.error = None;
        info!(%username, "authenticated");

        Ok(AuthOutcome {
            redirect: Route::jobs(username),
            session,
        })
    }
}
