//! Runs the real HTTP client against an in-process axum backend.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

use jobtrack::api::{ApiClient, ApiError, AuthApi, JobsApi, LoginRequest, SignupRequest};
use jobtrack::models::{sanitize_all, Id, Job, JobStatus, NewContact};
use jobtrack::session::SessionStore;
use jobtrack::sync::JobsEngine;

const TOKEN: &str = "jwt-1";

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct Stub {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Stub {
    fn record(&self, method: Method, uri: &Uri, headers: &HeaderMap) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push(Seen {
            method,
            path: uri.path().to_string(),
            authorization,
        });
    }

    fn last(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn login(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(method, &uri, &headers);
    if body["password"] == "gateway" {
        return gateway_page();
    }
    if body["password"] == "secret1" {
        reply(StatusCode::OK, json!({ "token": TOKEN, "username": body["username"] }))
    } else {
        reply(StatusCode::UNAUTHORIZED, json!({ "message": "Invalid credentials" }))
    }
}

async fn signup(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(method, &uri, &headers);
    if body["username"] == "gateway" {
        return gateway_page();
    }
    (StatusCode::CONFLICT, "Username already taken").into_response()
}

fn gateway_page() -> Response {
    (StatusCode::BAD_GATEWAY, Html("<html><body>502 Bad Gateway</body></html>")).into_response()
}

async fn list_jobs(
    State(stub): State<Stub>,
    Path(username): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    stub.record(method, &uri, &headers);
    if !authorized(&headers) {
        return reply(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }));
    }
    if username == "ghost" {
        return reply(StatusCode::NOT_FOUND, json!({ "error": "User not found" }));
    }
    reply(
        StatusCode::OK,
        json!([
            { "id": 1, "company": username, "status": "Interviewing", "contacts": null },
            { "id": 2, "company": "Globex" }
        ]),
    )
}

async fn create_job(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    stub.record(method, &uri, &headers);
    body["id"] = json!(41);
    reply(StatusCode::CREATED, body)
}

async fn update_job(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(method, &uri, &headers);
    reply(StatusCode::OK, body)
}

async fn delete_job(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    stub.record(method, &uri, &headers);
    if id == "99" {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn create_contact(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    stub.record(method, &uri, &headers);
    body["id"] = json!(500);
    reply(StatusCode::CREATED, body)
}

async fn delete_contact(State(stub): State<Stub>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    stub.record(method, &uri, &headers);
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_backend(stub: Stub) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route(
            "/api/jobs/:key",
            axum::routing::get(list_jobs)
                .post(create_job)
                .put(update_job)
                .delete(delete_job),
        )
        .route("/api/jobs/:key/contacts", post(create_contact))
        .route("/api/jobs/contacts/:id", put(update_job).delete(delete_contact))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn session_store() -> (Arc<SessionStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
    (Arc::new(store), dir)
}

async fn client(stub: &Stub, logged_in: bool) -> (ApiClient, Arc<SessionStore>, TempDir) {
    let base = spawn_backend(stub.clone()).await;
    let (session, dir) = session_store();
    if logged_in {
        session.set(TOKEN, "alice").unwrap();
    }
    let client = ApiClient::new(&base, session.clone(), None).unwrap();
    (client, session, dir)
}

// ==================== Auth endpoints ====================

#[tokio::test]
async fn test_login_parses_token_without_sending_bearer() {
    let stub = Stub::default();
    let (client, session, _dir) = client(&stub, false).await;
    session.set("stale-token", "bob").unwrap();

    let response = client
        .login(&LoginRequest {
            username: "alice".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.token, TOKEN);
    assert_eq!(response.username.as_deref(), Some("alice"));
    let seen = stub.last();
    assert_eq!(seen.path, "/auth/login");
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.authorization, None);
}

#[tokio::test]
async fn test_login_rejection_reads_message_field() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, false).await;

    let err = client
        .login(&LoginRequest {
            username: "alice".to_string(),
            password: "nope".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Server {
            status: 401,
            message: Some("Invalid credentials".to_string()),
        }
    );
}

#[tokio::test]
async fn test_signup_plain_text_error_body() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, false).await;

    let err = client
        .signup(&SignupRequest {
            username: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), Some("Username already taken"));
    assert_eq!(stub.last().path, "/auth/signup");
}

#[tokio::test]
async fn test_html_error_pages_are_not_messages() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, false).await;

    let err = client
        .login(&LoginRequest {
            username: "alice".to_string(),
            password: "gateway".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Server { status: 502, message: None });
    assert_eq!(err.message_or("Login Failed"), "Login Failed");

    let err = client
        .signup(&SignupRequest {
            username: "gateway".to_string(),
            name: "Gate".to_string(),
            email: "gate@example.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), None);
}

// ==================== Jobs endpoints ====================

#[tokio::test]
async fn test_list_jobs_sends_bearer_and_encodes_username() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;

    let payload = client.list_jobs("a b/c").await.unwrap();
    let jobs = sanitize_all(&payload);

    let seen = stub.last();
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/jobs/a%20b%2Fc");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer jwt-1"));
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].company, "a b/c");
    assert_eq!(jobs[0].status, JobStatus::Interviewing);
    assert!(jobs[0].contacts.is_empty());
}

#[tokio::test]
async fn test_jobs_error_reads_error_field() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;

    let err = client.list_jobs("ghost").await.unwrap_err();
    assert_eq!(err.server_message(), Some("User not found"));
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, false).await;

    let err = client.list_jobs("alice").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(stub.last().authorization, None);
}

#[tokio::test]
async fn test_job_and_contact_endpoints() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;

    let created = client.create_job("alice", &Job::blank()).await.unwrap();
    assert_eq!(created["id"], 41);
    assert_eq!(stub.last().path, "/api/jobs/alice");
    assert_eq!(stub.last().method, Method::POST);

    let mut job = Job::blank();
    job.id = Some(Id::from(41));
    job.company = "Acme".to_string();
    let updated = client.update_job(Id::from(41), &job).await.unwrap();
    assert_eq!(updated["company"], "Acme");
    assert_eq!(stub.last().path, "/api/jobs/41");
    assert_eq!(stub.last().method, Method::PUT);

    let contact = client.create_contact(Id::from(41), &NewContact::default()).await.unwrap();
    assert_eq!(contact["id"], 500);
    assert_eq!(stub.last().path, "/api/jobs/41/contacts");

    let mut saved = jobtrack::models::sanitize_contact(&contact);
    saved.name = "Ana".to_string();
    client.update_contact(Id::from(500), &saved).await.unwrap();
    assert_eq!(stub.last().path, "/api/jobs/contacts/500");
    assert_eq!(stub.last().method, Method::PUT);

    client.delete_contact(Id::from(500)).await.unwrap();
    assert_eq!(stub.last().method, Method::DELETE);
    assert_eq!(stub.last().path, "/api/jobs/contacts/500");

    client.delete_job(Id::from(41)).await.unwrap();
    assert_eq!(stub.last().path, "/api/jobs/41");
    assert!(stub
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|s| s.authorization.as_deref() == Some("Bearer jwt-1")));
}

#[tokio::test]
async fn test_error_without_message_uses_fallback() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;

    let err = client.delete_job(Id::from(99)).await.unwrap_err();
    assert_eq!(err.server_message(), None);
    assert_eq!(err.message_or("Error deleting job"), "Error deleting job");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (session, _dir) = session_store();
    let client = ApiClient::new(&format!("http://{}", addr), session, None).unwrap();
    let err = client.list_jobs("alice").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn test_string_ids_are_used_verbatim_in_paths() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;

    let mut job = Job::blank();
    job.id = Some(Id::from("64f1c2ab9e"));
    client.update_job(Id::from("64f1c2ab9e"), &job).await.unwrap();
    assert_eq!(stub.last().path, "/api/jobs/64f1c2ab9e");

    client.delete_contact(Id::from("c-1")).await.unwrap();
    assert_eq!(stub.last().path, "/api/jobs/contacts/c-1");
}

// ==================== Engine over HTTP ====================

#[tokio::test]
async fn test_engine_loads_and_adds_over_http() {
    let stub = Stub::default();
    let (client, _session, _dir) = client(&stub, true).await;
    let engine = JobsEngine::new(client);

    engine.load("alice").await.unwrap();
    assert_eq!(engine.jobs().len(), 2);

    let created = engine.add_job().await.unwrap();
    assert_eq!(created.id, Some(Id::from(41)));
    assert_eq!(engine.jobs().len(), 3);

    engine.teardown();
}
