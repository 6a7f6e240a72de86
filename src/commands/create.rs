use anyhow::Result;

use crate::api::JobsApi;
use crate::sync::JobsEngine;

pub async fn run<G: JobsApi>(engine: &JobsEngine<G>) -> Result<()> {
    let job = engine.add_job().await?;
    let row = engine.jobs().len();
    match job.id {
        Some(id) => println!("Added job {} (id {})", row, id),
        None => println!("Added job {}", row),
    }
    Ok(())
}
