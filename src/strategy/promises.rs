//! Future combinators chained the way promises are.

use super::Job;
use crate::backend::{Filter, Record};
use crate::error::SequenceError;
use futures_util::TryFutureExt;

pub(super) async fn run(job: &Job) -> Result<Vec<Record>, SequenceError> {
    job.bounded("connect", job.connect())
        .and_then(move |connection| async move {
            let held = &connection;
            let outcome = job
                .bounded("insert", job.insert(held))
                .inspect_ok(move |inserted| job.reporter().inserted(inserted))
                .and_then(move |inserted| {
                    job.bounded("find", job.find(held, Filter::inserted(&inserted)))
                })
                .inspect_ok(move |docs| job.reporter().found(docs))
                .await;
            job.release(connection).await;
            outcome
        })
        .await
}
