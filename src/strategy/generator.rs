//! Straight-line async code: each `.await` suspends the run until the
//! operation settles, the way a generator yields to its driver.

use super::Job;
use crate::backend::{Filter, Record, SharedConnection};
use crate::error::SequenceError;

pub(super) async fn run(job: &Job) -> Result<Vec<Record>, SequenceError> {
    let connection = job.bounded("connect", job.connect()).await?;
    let outcome = insert_then_find(job, &connection).await;
    job.release(connection).await;
    outcome
}

async fn insert_then_find(
    job: &Job,
    connection: &SharedConnection,
) -> Result<Vec<Record>, SequenceError> {
    let inserted = job.bounded("insert", job.insert(connection)).await?;
    job.reporter().inserted(&inserted);

    let docs = job
        .bounded("find", job.find(connection, Filter::inserted(&inserted)))
        .await?;
    job.reporter().found(&docs);
    Ok(docs)
}
