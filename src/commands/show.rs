use anyhow::Result;

use super::index;
use crate::api::JobsApi;
use crate::models::{JobField, SyncStatus};
use crate::sync::JobsEngine;

/// Prints one job with its contacts. The contact panel is opened for the
/// duration of the render and closed again afterwards.
pub fn run<G: JobsApi>(engine: &JobsEngine<G>, row: usize) -> Result<()> {
    let i = index(row)?;
    engine.open_contacts(i)?;

    let state = engine.snapshot();
    let job = &state.jobs[i];

    match &job.id {
        Some(id) => println!("Job {} (id {})", row, id),
        None => println!("Job {} (not saved)", row),
    }
    for field in JobField::ALL {
        let value = job.get(field);
        if !value.is_empty() || field == JobField::Status {
            println!("{:<15} {}", format!("{}:", field.label()), value);
        }
    }
    if let SyncStatus::Diverged(reason) = &job.sync {
        println!("Unsaved changes: {}", reason);
    }

    println!();
    if job.contacts.is_empty() {
        println!("Contacts: (none)");
    } else {
        println!("Contacts:");
        for (n, contact) in job.contacts.iter().enumerate() {
            let name = if contact.name.is_empty() { "(no name)" } else { contact.name.as_str() };
            let mut line = format!("  {}. {}", n + 1, name);
            if !contact.role.is_empty() {
                line.push_str(&format!(", {}", contact.role));
            }
            if !contact.email.is_empty() {
                line.push_str(&format!(" <{}>", contact.email));
            }
            println!("{}", line);
        }
    }

    engine.close_contacts();
    Ok(())
}
