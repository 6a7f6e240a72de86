use anyhow::{bail, Result};

use super::{confirm, index, truncate};
use crate::api::JobsApi;
use crate::models::{Contact, ContactField};
use crate::sync::JobsEngine;

pub async fn add<G: JobsApi>(engine: &JobsEngine<G>, row: usize) -> Result<()> {
    let contact = engine.add_contact(index(row)?).await?;
    let position = engine.jobs()[row - 1].contacts.len();
    match contact.id {
        Some(id) => println!("Added contact {} to job {} (id {})", position, row, id),
        None => println!("Added contact {} to job {}", position, row),
    }
    Ok(())
}

pub async fn set<G: JobsApi>(
    engine: &JobsEngine<G>,
    row: usize,
    position: usize,
    field: ContactField,
    value: &str,
) -> Result<()> {
    engine
        .update_contact(index(row)?, index(position)?, field, value)
        .await?;
    println!("Updated contact {} of job {}", position, row);
    Ok(())
}

pub async fn delete<G: JobsApi>(
    engine: &JobsEngine<G>,
    row: usize,
    position: usize,
    force: bool,
) -> Result<()> {
    let contact = lookup(engine, row, position)?;
    let Some(id) = contact.id else {
        bail!("Contact {} of job {} has not been saved yet", position, row);
    };

    if !force {
        let label = if contact.name.is_empty() { "(no name)" } else { contact.name.as_str() };
        if !confirm(&format!("Delete contact {} \"{}\" from job {}?", position, label, row))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    engine.delete_contact(index(row)?, id).await?;
    println!("Deleted contact {} from job {}", position, row);
    Ok(())
}

pub fn list<G: JobsApi>(engine: &JobsEngine<G>, row: usize) -> Result<()> {
    let i = index(row)?;
    engine.open_contacts(i)?;
    let contacts = engine.jobs()[i].contacts.clone();
    engine.close_contacts();

    if contacts.is_empty() {
        println!("No contacts for job {}.", row);
        return Ok(());
    }

    for (n, contact) in contacts.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:<24} {}",
            n + 1,
            truncate(&contact.name, 24),
            truncate(&contact.role, 24),
            contact.email
        );
    }
    Ok(())
}

fn lookup<G: JobsApi>(engine: &JobsEngine<G>, row: usize, position: usize) -> Result<Contact> {
    let jobs = engine.jobs();
    let Some(job) = jobs.get(index(row)?) else {
        bail!("Job {} not found", row);
    };
    match job.contacts.get(index(position)?) {
        Some(contact) => Ok(contact.clone()),
        None => bail!("Contact {} of job {} not found", position, row),
    }
}
