//! Continuation-passing tasks run as a waterfall: each task receives the
//! previous result and a `Next` callback, and only the final callback sees
//! either the last value or the first error.

use super::Job;
use crate::backend::{Filter, InsertOutcome, Record, SharedConnection};
use crate::error::SequenceError;
use crate::sequence::{Sequence, SequenceBuilder};
use crate::waterfall::{acquire, task, Next};
use futures_util::FutureExt;

const DONE: &str = "All done";

fn sequence(job: &Job) -> Sequence<(), Vec<Record>> {
    let timeout = job.step_timeout();

    let connect = {
        let job = job.clone();
        task("connect", move |(), next: Next<SharedConnection>| {
            let job = job.clone();
            async move { next.call(job.connect().await) }.boxed()
        })
        .with_timeout(timeout)
    };

    let insert = {
        let job = job.clone();
        task(
            "insert",
            move |connection: SharedConnection, next: Next<(SharedConnection, InsertOutcome)>| {
                let job = job.clone();
                async move {
                    let result = job.insert(&connection).await;
                    next.call(result.map(|inserted| (connection, inserted)))
                }
                .boxed()
            },
        )
        .with_timeout(timeout)
    };

    let find = {
        let job = job.clone();
        task(
            "find",
            move |(connection, inserted): (SharedConnection, InsertOutcome),
                  next: Next<Vec<Record>>| {
                let job = job.clone();
                async move {
                    // Same "Result of insert" line as the other idioms, printed
                    // once the find task has the outcome in hand.
                    job.reporter().inserted(&inserted);
                    let result = job.find(&connection, Filter::inserted(&inserted)).await;
                    if let Ok(docs) = &result {
                        job.reporter().found(docs);
                    }
                    next.call(result)
                }
                .boxed()
            },
        )
        .with_timeout(timeout)
    };

    SequenceBuilder::new()
        .first(acquire(connect))
        .then(insert)
        .then(find)
        .build()
}

pub(super) async fn run(job: &Job) -> Result<Vec<Record>, SequenceError> {
    let docs = sequence(job).run(()).await?;
    job.reporter().finished(DONE);
    Ok(docs)
}
