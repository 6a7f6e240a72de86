//! HTTP client for the Job Tracker backend.
//!
//! All backend traffic goes through [`ApiClient`]. The engine and the auth
//! controller only see the [`AuthApi`] and [`JobsApi`] traits.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Contact, Id, Job, NewContact};
use crate::session::SessionStore;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded with status {status}: {}", .message.as_deref().unwrap_or("(no message)"))]
    Server { status: u16, message: Option<String> },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    Url(String),
}

impl ApiError {
    /// The human-readable message the server put in its error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Server { status: 401 | 403, .. })
    }
}

/// Which body field carries the message. The auth and jobs endpoints differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorField {
    /// `{"message": ...}` from `/auth/login`.
    Message,
    /// `{"message": ...}` from `/auth/signup`, which may also answer with a
    /// bare string.
    MessageOrText,
    /// `{"error": ...}` from `/api/jobs/*`.
    Error,
}

pub fn extract_message(body: &str, field: ErrorField) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let key = match field {
        ErrorField::Message | ErrorField::MessageOrText => "message",
        ErrorField::Error => "error",
    };
    let text_allowed = field == ErrorField::MessageOrText;

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Ok(Value::String(s)) if text_allowed && !s.is_empty() => Some(s),
        Ok(_) => None,
        Err(_) if text_allowed => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError>;
}

/// Jobs and contacts endpoints. Payloads come back raw; callers sanitize.
#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn list_jobs(&self, username: &str) -> Result<Value, ApiError>;
    async fn create_job(&self, username: &str, job: &Job) -> Result<Value, ApiError>;
    async fn update_job(&self, id: Id, job: &Job) -> Result<Value, ApiError>;
    async fn delete_job(&self, id: Id) -> Result<(), ApiError>;
    async fn create_contact(&self, job_id: Id, contact: &NewContact) -> Result<Value, ApiError>;
    async fn update_contact(&self, id: Id, contact: &Contact) -> Result<Value, ApiError>;
    async fn delete_contact(&self, id: Id) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        session: Arc<SessionStore>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Url(format!("{base_url} cannot be used as a base URL")));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, authenticated: bool) -> RequestBuilder {
        debug!(%method, %url, "api request");
        let builder = self.client.request(method, url);
        match self.session.token() {
            Some(token) if authenticated && !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, field: ErrorField) -> Result<String, ApiError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "request failed before a response arrived");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let field = match field {
            ErrorField::MessageOrText if is_markup(&response) => ErrorField::Message,
            other => other,
        };
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = extract_message(&body, field);
            warn!(status = status.as_u16(), message = ?message, "api error response");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn send_json(&self, builder: RequestBuilder, field: ErrorField) -> Result<Value, ApiError> {
        let body = self.send(builder, field).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Error pages from proxies and gateways are never shown as a message.
fn is_markup(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("html"))
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        let value = self
            .send_json(self.request(Method::POST, url, false).json(request), ErrorField::Message)
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["auth", "signup"])?;
        let value = self
            .send_json(self.request(Method::POST, url, false).json(request), ErrorField::MessageOrText)
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobsApi for ApiClient {
    async fn list_jobs(&self, username: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "jobs", username])?;
        self.send_json(self.request(Method::GET, url, true), ErrorField::Error)
            .await
    }

    async fn create_job(&self, username: &str, job: &Job) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "jobs", username])?;
        self.send_json(self.request(Method::POST, url, true).json(job), ErrorField::Error)
            .await
    }

    async fn update_job(&self, id: Id, job: &Job) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "jobs", &id.to_string()])?;
        self.send_json(self.request(Method::PUT, url, true).json(job), ErrorField::Error)
            .await
    }

    async fn delete_job(&self, id: Id) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "jobs", &id.to_string()])?;
        self.send(self.request(Method::DELETE, url, true), ErrorField::Error)
            .await
            .map(|_| ())
    }

    async fn create_contact(&self, job_id: Id, contact: &NewContact) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "jobs", &job_id.to_string(), "contacts"])?;
        self.send_json(self.request(Method::POST, url, true).json(contact), ErrorField::Error)
            .await
    }

    async fn update_contact(&self, id: Id, contact: &Contact) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "jobs", "contacts", &id.to_string()])?;
        self.send_json(self.request(Method::PUT, url, true).json(contact), ErrorField::Error)
            .await
    }

    async fn delete_contact(&self, id: Id) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "jobs", "contacts", &id.to_string()])?;
        self.send(self.request(Method::DELETE, url, true), ErrorField::Error)
            .await
            .map(|_| ())
    }
}
