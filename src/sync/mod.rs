//! Client-side state for the jobs dashboard and its reconciliation with the
//! backend.
//!
//! Local edits land in state immediately; the matching request runs
//! afterwards. Only job creation and contact creation are rolled back on
//! failure. Every change to the job list installs a fresh `Arc<Vec<Job>>`
//! and bumps [`JobsState::version`], so subscribers can detect changes by
//! pointer or by version.

mod contacts;
#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, JobsApi};
use crate::models::{sanitize, sanitize_all, Id, Job, JobField, SyncStatus};

pub const NO_USERNAME_MESSAGE: &str = "No username found. Please log in again.";
pub const JOB_NOT_SAVED_MESSAGE: &str = "Please save the job first before adding contacts.";

const LOAD_FALLBACK: &str = "Failed to load jobs.";
const ADD_JOB_FALLBACK: &str = "Error adding job";
const UPDATE_JOB_FALLBACK: &str = "Error updating job";
const DELETE_JOB_FALLBACK: &str = "Error deleting job";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("No username found. Please log in again.")]
    NoUsername,

    #[error("Please save the job first before adding contacts.")]
    JobNotSaved,

    #[error("No job at position {}", .0 + 1)]
    NoSuchJob(usize),

    #[error("No contact at position {} of job {}", .contact + 1, .job + 1)]
    NoSuchContact { job: usize, contact: usize },

    #[error("{0}")]
    InvalidValue(String),

    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("The view was closed before the request completed")]
    Detached,
}

impl SyncError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Request { source, .. } if source.is_unauthorized())
    }
}

/// Everything the jobs view renders.
#[derive(Debug, Clone, Default)]
pub struct JobsState {
    pub username: Option<String>,
    pub jobs: Arc<Vec<Job>>,
    pub version: u64,
    pub loading: bool,
    pub load_error: Option<String>,
    pub active_contact_modal: Option<usize>,
    /// Blocking notification from the last failed operation.
    pub alert: Option<String>,
}

pub struct JobsEngine<G> {
    api: G,
    state: watch::Sender<JobsState>,
    lifetime: CancellationToken,
    next_temp_key: AtomicU64,
}

impl<G: JobsApi> JobsEngine<G> {
    pub fn new(api: G) -> Self {
        let (state, _) = watch::channel(JobsState::default());
        Self {
            api,
            state,
            lifetime: CancellationToken::new(),
            next_temp_key: AtomicU64::new(1),
        }
    }

    pub fn api(&self) -> &G {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<JobsState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> JobsState {
        self.state.borrow().clone()
    }

    pub fn jobs(&self) -> Arc<Vec<Job>> {
        self.state.borrow().jobs.clone()
    }

    /// Ends the view's lifetime. Requests still in flight are abandoned and
    /// their completions are never applied.
    pub fn teardown(&self) {
        debug!("jobs view torn down");
        self.lifetime.cancel();
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    pub fn dismiss_alert(&self) {
        self.state.send_if_modified(|state| state.alert.take().is_some());
    }

    pub fn open_contacts(&self, index: usize) -> Result<(), SyncError> {
        if index >= self.state.borrow().jobs.len() {
            return Err(SyncError::NoSuchJob(index));
        }
        self.state.send_modify(|state| state.active_contact_modal = Some(index));
        Ok(())
    }

    pub fn close_contacts(&self) {
        self.state
            .send_if_modified(|state| state.active_contact_modal.take().is_some());
    }

    pub async fn load(&self, username: &str) -> Result<(), SyncError> {
        if username.is_empty() {
            self.state.send_modify(|state| {
                state.username = None;
                state.loading = false;
                state.load_error = Some(NO_USERNAME_MESSAGE.to_string());
            });
            return Err(SyncError::NoUsername);
        }

        self.state.send_modify(|state| {
            state.username = Some(username.to_string());
            state.loading = true;
            state.load_error = None;
        });

        match self.guarded(self.api.list_jobs(username)).await? {
            Ok(payload) => {
                let jobs = sanitize_all(&payload);
                info!(%username, count = jobs.len(), "jobs loaded");
                self.state.send_modify(|state| {
                    state.jobs = Arc::new(jobs);
                    state.version += 1;
                    state.loading = false;
                });
                Ok(())
            }
            Err(source) => {
                let message = source.message_or(LOAD_FALLBACK);
                warn!(%username, error = %source, "loading jobs failed");
                self.state.send_modify(|state| {
                    if !state.jobs.is_empty() {
                        state.jobs = Arc::new(Vec::new());
                        state.version += 1;
                    }
                    state.loading = false;
                    state.load_error = Some(message.clone());
                });
                Err(SyncError::Request { message, source })
            }
        }
    }

    /// Creates a blank job on the server. The list only grows once the
    /// server has answered.
    pub async fn add_job(&self) -> Result<Job, SyncError> {
        let username = self.state.borrow().username.clone();
        let Some(username) = username else {
            self.raise(NO_USERNAME_MESSAGE);
            return Err(SyncError::NoUsername);
        };

        let template = Job::blank();
        match self.guarded(self.api.create_job(&username, &template)).await? {
            Ok(payload) => {
                let created = sanitize(&payload);
                debug!(id = ?created.id, "job created");
                let appended = created.clone();
                self.modify_jobs(move |jobs| {
                    jobs.push(appended);
                    true
                });
                Ok(created)
            }
            Err(source) => Err(self.fail(source, ADD_JOB_FALLBACK)),
        }
    }

    /// Writes one field locally, then sends the whole record if the job
    /// exists on the server. A failed send leaves the edit in place and
    /// marks the job as diverged.
    pub async fn update_job(&self, index: usize, field: JobField, value: &str) -> Result<(), SyncError> {
        let job = self.mutate_jobs(|jobs| {
            let job = jobs.get_mut(index).ok_or(SyncError::NoSuchJob(index))?;
            job.set(field, value).map_err(SyncError::InvalidValue)?;
            if job.is_persisted() {
                job.sync = SyncStatus::Pending;
            }
            Ok(job.clone())
        })?;

        let Some(id) = job.id.clone() else {
            debug!(index, field = field.wire_name(), "job not persisted; edit kept locally");
            return Ok(());
        };

        match self.guarded(self.api.update_job(id.clone(), &job)).await? {
            Ok(_) => {
                self.settle_job(&id, job.revision, SyncStatus::Synced);
                Ok(())
            }
            Err(source) => {
                let error = self.fail(source, UPDATE_JOB_FALLBACK);
                self.settle_job(&id, job.revision, SyncStatus::Diverged(error.to_string()));
                Err(error)
            }
        }
    }

    pub async fn delete_job(&self, id: Id) -> Result<(), SyncError> {
        match self.guarded(self.api.delete_job(id.clone())).await? {
            Ok(()) => {
                self.state.send_if_modified(|state| {
                    let Some(position) = state.jobs.iter().position(|j| j.id.as_ref() == Some(&id)) else {
                        return false;
                    };
                    let mut jobs = Vec::clone(&state.jobs);
                    jobs.remove(position);
                    state.jobs = Arc::new(jobs);
                    state.version += 1;
                    state.active_contact_modal = match state.active_contact_modal {
                        Some(open) if open == position => None,
                        Some(open) if open > position => Some(open - 1),
                        other => other,
                    };
                    true
                });
                debug!(%id, "job deleted");
                Ok(())
            }
            Err(source) => Err(self.fail(source, DELETE_JOB_FALLBACK)),
        }
    }

    // Shared plumbing

    /// Runs a request unless the view is torn down first.
    async fn guarded<T, F>(&self, request: F) -> Result<Result<T, ApiError>, SyncError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if self.lifetime.is_cancelled() {
            return Err(SyncError::Detached);
        }

        tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => {
                debug!("request abandoned after teardown");
                Err(SyncError::Detached)
            }
            result = request => {
                if self.lifetime.is_cancelled() {
                    return Err(SyncError::Detached);
                }
                Ok(result)
            }
        }
    }

    /// Applies `f` to a copy of the job list and publishes the copy if `f`
    /// succeeds. On error nothing is published.
    fn mutate_jobs<R>(
        &self,
        f: impl FnOnce(&mut Vec<Job>) -> Result<R, SyncError>,
    ) -> Result<R, SyncError> {
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            let mut jobs = Vec::clone(&state.jobs);
            let result = f(&mut jobs);
            let changed = result.is_ok();
            if changed {
                state.jobs = Arc::new(jobs);
                state.version += 1;
            }
            outcome = Some(result);
            changed
        });
        outcome.unwrap_or_else(|| unreachable!("send_if_modified always runs its closure"))
    }

    /// Like [`Self::mutate_jobs`] for completions that may find nothing to do.
    fn modify_jobs(&self, f: impl FnOnce(&mut Vec<Job>) -> bool) {
        self.state.send_if_modified(|state| {
            let mut jobs = Vec::clone(&state.jobs);
            if !f(&mut jobs) {
                return false;
            }
            state.jobs = Arc::new(jobs);
            state.version += 1;
            true
        });
    }

    /// Records the outcome of an update unless a newer edit has been made
    /// since it was sent.
    fn settle_job(&self, id: &Id, revision: u64, status: SyncStatus) {
        self.modify_jobs(|jobs| match jobs.iter_mut().find(|j| j.id.as_ref() == Some(id)) {
            Some(job) if job.revision == revision && job.sync != status => {
                job.sync = status;
                true
            }
            _ => false,
        });
    }

    fn raise(&self, message: &str) {
        self.state
            .send_modify(|state| state.alert = Some(message.to_string()));
    }

    fn fail(&self, source: ApiError, fallback: &str) -> SyncError {
        let message = source.message_or(fallback);
        warn!(error = %source, "{}", fallback);
        self.raise(&message);
        SyncError::Request { message, source }
    }
}
