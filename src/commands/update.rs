use anyhow::Result;

use super::index;
use crate::api::JobsApi;
use crate::models::JobField;
use crate::sync::JobsEngine;

pub async fn run<G: JobsApi>(
    engine: &JobsEngine<G>,
    row: usize,
    field: JobField,
    value: &str,
) -> Result<()> {
    engine.update_job(index(row)?, field, value).await?;

    let saved = engine.jobs()[row - 1].is_persisted();
    if saved {
        println!("Updated {} of job {}", field.label(), row);
    } else {
        println!("Updated {} of job {} (local only, job not saved yet)", field.label(), row);
    }
    Ok(())
}
