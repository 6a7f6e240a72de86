use anyhow::{bail, Result};

use super::{confirm, index};
use crate::api::JobsApi;
use crate::sync::JobsEngine;

pub async fn run<G: JobsApi>(engine: &JobsEngine<G>, row: usize, force: bool) -> Result<()> {
    let i = index(row)?;
    let job = match engine.jobs().get(i) {
        Some(job) => job.clone(),
        None => bail!("Job {} not found", row),
    };
    let Some(id) = job.id.clone() else {
        bail!("Job {} has not been saved yet", row);
    };

    if !force {
        let label = if job.company.is_empty() { "(untitled)" } else { job.company.as_str() };
        if !confirm(&format!("Delete job {} \"{}\"?", row, label))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    engine.delete_job(id).await?;
    println!("Deleted job {}", row);
    Ok(())
}

/// Internal function for testing without stdin interaction
#[cfg(test)]
pub async fn run_force<G: JobsApi>(engine: &JobsEngine<G>, row: usize) -> Result<()> {
    run(engine, row, true).await
}
