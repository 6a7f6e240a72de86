use anyhow::Result;

use super::truncate;
use crate::api::JobsApi;
use crate::models::{Job, SyncStatus};
use crate::sync::JobsEngine;

pub fn run<G: JobsApi>(engine: &JobsEngine<G>) -> Result<()> {
    let jobs = engine.jobs();

    if jobs.is_empty() {
        println!("No jobs yet. Run 'jobtrack add' to create one.");
        return Ok(());
    }

    println!(
        "{:<4} {:<24} {:<24} {:<12} {:<12} {}",
        "#", "Company", "Role", "Status", "Applied On", "Contacts"
    );
    for (i, job) in jobs.iter().enumerate() {
        println!("{}", format_row(i + 1, job));
    }

    Ok(())
}

pub(crate) fn format_row(row: usize, job: &Job) -> String {
    format!(
        "{:<4} {:<24} {:<24} {:<12} {:<12} {}{}",
        row,
        truncate(&job.company, 24),
        truncate(&job.role, 24),
        job.status,
        truncate(&job.applied_on, 12),
        job.contacts.len(),
        sync_marker(&job.sync)
    )
}

pub(crate) fn sync_marker(sync: &SyncStatus) -> &'static str {
    match sync {
        SyncStatus::Synced => "",
        SyncStatus::Pending => "  (saving)",
        SyncStatus::Diverged(_) => "  (not saved)",
    }
}
