//! In-memory backend used by the engine tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::api::{ApiError, JobsApi};
use crate::models::{Contact, Id, Job, NewContact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    CreateJob,
    UpdateJob,
    DeleteJob,
    CreateContact,
    UpdateContact,
    DeleteContact,
}

/// A request as the server saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(String),
    CreateJob(String, Value),
    UpdateJob(Id, Value),
    DeleteJob(Id),
    CreateContact(Id, Value),
    UpdateContact(Id, Value),
    DeleteContact(Id),
}

/// Numeric id as the fake server hands them out.
pub fn id(n: i64) -> Id {
    Id::from(n)
}

struct Failure {
    error: ApiError,
    once: bool,
}

struct Inner {
    jobs: Vec<Value>,
    next_id: i64,
    calls: Vec<Call>,
    failures: HashMap<Op, Failure>,
    gates: HashMap<Op, Arc<Notify>>,
    raw: HashMap<Op, Value>,
}

pub struct FakeJobsApi {
    inner: Mutex<Inner>,
}

impl Default for FakeJobsApi {
    fn default() -> Self {
        Self::with_jobs(Vec::new())
    }
}

impl FakeJobsApi {
    pub fn with_jobs(jobs: Vec<Value>) -> Self {
        let max_id = jobs
            .iter()
            .filter_map(|j| j.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        Self {
            inner: Mutex::new(Inner {
                jobs,
                next_id: max_id.max(99) + 1,
                calls: Vec::new(),
                failures: HashMap::new(),
                gates: HashMap::new(),
                raw: HashMap::new(),
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Every later request for `op` fails with `error`.
    pub fn fail(&self, op: Op, error: ApiError) {
        self.lock().failures.insert(op, Failure { error, once: false });
    }

    pub fn fail_once(&self, op: Op, error: ApiError) {
        self.lock().failures.insert(op, Failure { error, once: true });
    }

    /// Requests for `op` wait for one `notify_one` each before answering.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        self.lock()
            .gates
            .entry(op)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Answer the next `op` request with `body` verbatim.
    pub fn respond_raw(&self, op: Op, body: Value) {
        self.lock().raw.insert(op, body);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    async fn enter(&self, op: Op, call: Call) -> Result<(), ApiError> {
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(call);
            inner.gates.get(&op).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut inner = self.lock();
        let Some(failure) = inner.failures.get(&op) else {
            return Ok(());
        };
        let error = failure.error.clone();
        if failure.once {
            inner.failures.remove(&op);
        }
        Err(error)
    }

    fn respond(&self, op: Op, body: Value) -> Value {
        self.lock().raw.remove(&op).unwrap_or(body)
    }

    fn take_id(&self) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }
}

#[async_trait]
impl JobsApi for FakeJobsApi {
    async fn list_jobs(&self, username: &str) -> Result<Value, ApiError> {
        self.enter(Op::List, Call::List(username.to_string())).await?;
        let jobs = self.lock().jobs.clone();
        Ok(self.respond(Op::List, Value::Array(jobs)))
    }

    async fn create_job(&self, username: &str, job: &Job) -> Result<Value, ApiError> {
        let body = serde_json::to_value(job).unwrap();
        self.enter(Op::CreateJob, Call::CreateJob(username.to_string(), body.clone()))
            .await?;
        let mut created = body;
        created["id"] = json!(self.take_id());
        self.lock().jobs.push(created.clone());
        Ok(self.respond(Op::CreateJob, created))
    }

    async fn update_job(&self, id: Id, job: &Job) -> Result<Value, ApiError> {
        let body = serde_json::to_value(job).unwrap();
        self.enter(Op::UpdateJob, Call::UpdateJob(id.clone(), body.clone())).await?;
        let mut inner = self.lock();
        if let Some(stored) = inner.jobs.iter_mut().find(|j| j["id"] == json!(id)) {
            *stored = body.clone();
        }
        drop(inner);
        Ok(self.respond(Op::UpdateJob, body))
    }

    async fn delete_job(&self, id: Id) -> Result<(), ApiError> {
        self.enter(Op::DeleteJob, Call::DeleteJob(id.clone())).await?;
        self.lock().jobs.retain(|j| j["id"] != json!(id));
        Ok(())
    }

    async fn create_contact(&self, job_id: Id, contact: &NewContact) -> Result<Value, ApiError> {
        let body = serde_json::to_value(contact).unwrap();
        self.enter(Op::CreateContact, Call::CreateContact(job_id.clone(), body.clone()))
            .await?;
        let mut created = body;
        created["id"] = json!(self.take_id());
        let mut inner = self.lock();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j["id"] == json!(job_id)) {
            match job.get_mut("contacts").and_then(Value::as_array_mut) {
                Some(contacts) => contacts.push(created.clone()),
                None => job["contacts"] = json!([created.clone()]),
            }
        }
        drop(inner);
        Ok(self.respond(Op::CreateContact, created))
    }

    async fn update_contact(&self, id: Id, contact: &Contact) -> Result<Value, ApiError> {
        let body = serde_json::to_value(contact).unwrap();
        self.enter(Op::UpdateContact, Call::UpdateContact(id.clone(), body.clone()))
            .await?;
        Ok(self.respond(Op::UpdateContact, body))
    }

    async fn delete_contact(&self, id: Id) -> Result<(), ApiError> {
        self.enter(Op::DeleteContact, Call::DeleteContact(id.clone())).await?;
        for job in self.lock().jobs.iter_mut() {
            if let Some(contacts) = job.get_mut("contacts").and_then(Value::as_array_mut) {
                contacts.retain(|c| c["id"] != json!(id));
            }
        }
        Ok(())
    }
}
