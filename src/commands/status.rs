use anyhow::Result;

use crate::api::JobsApi;
use crate::models::{JobField, JobStatus};
use crate::sync::JobsEngine;

pub async fn run<G: JobsApi>(engine: &JobsEngine<G>, row: usize, status: JobStatus) -> Result<()> {
    super::update::run(engine, row, JobField::Status, status.as_str()).await
}
