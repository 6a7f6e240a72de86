use std::sync::atomic::Ordering;
use tracing::debug;

use super::{JobsEngine, SyncError, JOB_NOT_SAVED_MESSAGE};
use crate::api::JobsApi;
use crate::models::{sanitize_contact, Contact, ContactField, Id, Job, NewContact, SyncStatus};

const ADD_CONTACT_FALLBACK: &str = "Error adding contact";
const UPDATE_CONTACT_FALLBACK: &str = "Error updating contact";
const DELETE_CONTACT_FALLBACK: &str = "Error deleting contact";

impl<G: JobsApi> JobsEngine<G> {
    /// Adds a placeholder contact to a saved job and creates it on the server.
    ///
    /// The placeholder carries a temporary key; the server's answer replaces
    /// exactly that placeholder, and a failure removes it again. Fields edited
    /// on the placeholder while the request was out are kept and sent as an
    /// update once the contact has an id.
    pub async fn add_contact(&self, job_index: usize) -> Result<Contact, SyncError> {
        let temp_key = self.next_temp_key.fetch_add(1, Ordering::Relaxed);

        let job_id = match self.mutate_jobs(|jobs| {
            let job = jobs.get_mut(job_index).ok_or(SyncError::NoSuchJob(job_index))?;
            let id = job.id.clone().ok_or(SyncError::JobNotSaved)?;
            job.contacts.push(Contact::placeholder(temp_key));
            Ok(id)
        }) {
            Ok(id) => id,
            Err(SyncError::JobNotSaved) => {
                self.raise(JOB_NOT_SAVED_MESSAGE);
                return Err(SyncError::JobNotSaved);
            }
            Err(other) => return Err(other),
        };

        let request = NewContact::default();
        match self.guarded(self.api.create_contact(job_id.clone(), &request)).await? {
            Ok(payload) => {
                let saved = sanitize_contact(&payload);
                debug!(%job_id, id = ?saved.id, "contact created");

                let mut installed = None;
                self.modify_jobs(|jobs| {
                    let Some(slot) = placeholder_slot(jobs, &job_id, temp_key) else {
                        return false;
                    };
                    let replacement = adopt_local_edits(slot, saved.clone());
                    installed = Some(replacement.clone());
                    *slot = replacement;
                    true
                });

                let Some(contact) = installed else {
                    return Ok(saved);
                };
                if contact.sync != SyncStatus::Pending {
                    return Ok(contact);
                }
                let Some(id) = contact.id.clone() else {
                    return Ok(contact);
                };
                debug!(%id, "sending edits made while the contact was being created");
                self.push_contact(Some(&job_id), id, &contact).await?;
                Ok(contact)
            }
            Err(source) => {
                self.modify_jobs(|jobs| {
                    let Some(job) = jobs.iter_mut().find(|j| j.id.as_ref() == Some(&job_id)) else {
                        return false;
                    };
                    let before = job.contacts.len();
                    job.contacts.retain(|c| c.temp_key != Some(temp_key));
                    job.contacts.len() != before
                });
                Err(self.fail(source, ADD_CONTACT_FALLBACK))
            }
        }
    }

    /// Writes one contact field locally, then sends the whole contact if it
    /// exists on the server. No rollback on failure.
    pub async fn update_contact(
        &self,
        job_index: usize,
        contact_index: usize,
        field: ContactField,
        value: &str,
    ) -> Result<(), SyncError> {
        let (job_id, contact) = self.mutate_jobs(|jobs| {
            let job = jobs.get_mut(job_index).ok_or(SyncError::NoSuchJob(job_index))?;
            let job_id = job.id.clone();
            let contact = job
                .contacts
                .get_mut(contact_index)
                .ok_or(SyncError::NoSuchContact {
                    job: job_index,
                    contact: contact_index,
                })?;
            contact.set(field, value);
            if contact.is_persisted() {
                contact.sync = SyncStatus::Pending;
            }
            Ok((job_id, contact.clone()))
        })?;

        let Some(id) = contact.id.clone() else {
            debug!(job_index, contact_index, "contact not saved yet; edit sent once it is");
            return Ok(());
        };

        self.push_contact(job_id.as_ref(), id, &contact).await
    }

    /// Deletes a contact on the server, then drops it from its job.
    pub async fn delete_contact(&self, job_index: usize, contact_id: Id) -> Result<(), SyncError> {
        let job_id = self
            .state
            .borrow()
            .jobs
            .get(job_index)
            .map(|job| job.id.clone())
            .ok_or(SyncError::NoSuchJob(job_index))?;

        match self.guarded(self.api.delete_contact(contact_id.clone())).await? {
            Ok(()) => {
                self.modify_jobs(|jobs| {
                    let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
                        return false;
                    };
                    let before = job.contacts.len();
                    job.contacts.retain(|c| c.id.as_ref() != Some(&contact_id));
                    job.contacts.len() != before
                });
                debug!(%contact_id, "contact deleted");
                Ok(())
            }
            Err(source) => Err(self.fail(source, DELETE_CONTACT_FALLBACK)),
        }
    }

    async fn push_contact(&self, job_id: Option<&Id>, id: Id, contact: &Contact) -> Result<(), SyncError> {
        match self.guarded(self.api.update_contact(id.clone(), contact)).await? {
            Ok(_) => {
                self.settle_contact(job_id, &id, contact.revision, SyncStatus::Synced);
                Ok(())
            }
            Err(source) => {
                let error = self.fail(source, UPDATE_CONTACT_FALLBACK);
                self.settle_contact(
                    job_id,
                    &id,
                    contact.revision,
                    SyncStatus::Diverged(error.to_string()),
                );
                Err(error)
            }
        }
    }

    fn settle_contact(&self, job_id: Option<&Id>, id: &Id, revision: u64, status: SyncStatus) {
        self.modify_jobs(|jobs| {
            let contact = jobs
                .iter_mut()
                .filter(|j| j.id.as_ref() == job_id)
                .flat_map(|j| j.contacts.iter_mut())
                .find(|c| c.id.as_ref() == Some(id));
            match contact {
                Some(contact) if contact.revision == revision && contact.sync != status => {
                    contact.sync = status;
                    true
                }
                _ => false,
            }
        });
    }
}

fn placeholder_slot<'a>(jobs: &'a mut [Job], job_id: &Id, temp_key: u64) -> Option<&'a mut Contact> {
    jobs.iter_mut()
        .find(|j| j.id.as_ref() == Some(job_id))?
        .contacts
        .iter_mut()
        .find(|c| c.temp_key == Some(temp_key))
}

/// Builds the record that replaces a placeholder. An untouched placeholder
/// is simply the server's copy; an edited one keeps its local fields and is
/// left pending until they have been sent.
fn adopt_local_edits(placeholder: &Contact, mut saved: Contact) -> Contact {
    if placeholder.revision == 0 {
        return saved;
    }
    saved.name = placeholder.name.clone();
    saved.role = placeholder.role.clone();
    saved.email = placeholder.email.clone();
    saved.revision = placeholder.revision;
    saved.sync = if saved.is_persisted() {
        SyncStatus::Pending
    } else {
        SyncStatus::Synced
    };
    saved
}
