//! Completion handlers flattened into an ordered list of steps.

use super::Job;
use crate::backend::{Filter, InsertOutcome, Record};
use crate::context::Context;
use crate::error::SequenceError;
use crate::sequence::{Sequence, SequenceBuilder};
use crate::step::{Step, StepConfig, StepName};
use async_trait::async_trait;

/// Opens the connection and hands it to the run's context.
struct Connect {
    job: Job,
}

#[async_trait]
impl Step for Connect {
    type Input = ();
    type Output = ();

    async fn execute(&self, ctx: &mut Context, _input: ()) -> Result<(), SequenceError> {
        let connection = self.job.connect().await?;
        ctx.acquire(connection).await
    }

    fn name(&self) -> StepName {
        StepName::new("connect")
    }

    fn config(&self) -> StepConfig {
        StepConfig::with_timeout(self.job.step_timeout())
    }
}

struct Insert {
    job: Job,
}

#[async_trait]
impl Step for Insert {
    type Input = ();
    type Output = InsertOutcome;

    async fn execute(&self, ctx: &mut Context, _input: ()) -> Result<InsertOutcome, SequenceError> {
        let inserted = self.job.insert(ctx.connection()?).await?;
        self.job.reporter().inserted(&inserted);
        Ok(inserted)
    }

    fn name(&self) -> StepName {
        StepName::new("insert")
    }

    fn config(&self) -> StepConfig {
        StepConfig::with_timeout(self.job.step_timeout())
    }
}

/// Looks up the record the previous step inserted.
struct Find {
    job: Job,
}

#[async_trait]
impl Step for Find {
    type Input = InsertOutcome;
    type Output = Vec<Record>;

    async fn execute(
        &self,
        ctx: &mut Context,
        inserted: InsertOutcome,
    ) -> Result<Vec<Record>, SequenceError> {
        let docs = self
            .job
            .find(ctx.connection()?, Filter::inserted(&inserted))
            .await?;
        self.job.reporter().found(&docs);
        Ok(docs)
    }

    fn name(&self) -> StepName {
        StepName::new("find")
    }

    fn config(&self) -> StepConfig {
        StepConfig::with_timeout(self.job.step_timeout())
    }
}

/// Reads back the whole collection.
struct FindAll {
    job: Job,
}

#[async_trait]
impl Step for FindAll {
    type Input = ();
    type Output = Vec<Record>;

    async fn execute(&self, ctx: &mut Context, _input: ()) -> Result<Vec<Record>, SequenceError> {
        let docs = self.job.find(ctx.connection()?, Filter::All).await?;
        self.job.reporter().found(&docs);
        Ok(docs)
    }

    fn name(&self) -> StepName {
        StepName::new("find")
    }

    fn config(&self) -> StepConfig {
        StepConfig::with_timeout(self.job.step_timeout())
    }
}

fn sequence(job: &Job) -> Sequence<(), Vec<Record>> {
    SequenceBuilder::new()
        .first(Connect { job: job.clone() })
        .then(Insert { job: job.clone() })
        .then(Find { job: job.clone() })
        .build()
}

fn listing(job: &Job) -> Sequence<(), Vec<Record>> {
    SequenceBuilder::new()
        .first(Connect { job: job.clone() })
        .then(FindAll { job: job.clone() })
        .build()
}

pub(super) async fn run(job: &Job) -> Result<Vec<Record>, SequenceError> {
    sequence(job).run(()).await
}

pub(super) async fn list(job: &Job) -> Result<Vec<Record>, SequenceError> {
    listing(job).run(()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;
    use crate::strategy::tests::job_with;
    use std::sync::Arc;

    #[test]
    fn test_steps_run_in_declared_order() {
        let (job, _) = job_with(Arc::new(MemoryConnector::new()));
        assert_eq!(
            sequence(&job).step_names(),
            vec![
                StepName::new("connect"),
                StepName::new("insert"),
                StepName::new("find"),
            ]
        );
    }

    #[test]
    fn test_listing_skips_insert() {
        let (job, _) = job_with(Arc::new(MemoryConnector::new()));
        assert_eq!(
            listing(&job).step_names(),
            vec![StepName::new("connect"), StepName::new("find")]
        );
    }

    #[tokio::test]
    async fn test_connect_twice_closes_second_connection() {
        let connector = Arc::new(MemoryConnector::new());
        let (job, _) = job_with(connector.clone());
        let connect = Connect { job };
        let mut ctx = Context::new();

        connect.execute(&mut ctx, ()).await.unwrap();
        let again = connect.execute(&mut ctx, ()).await;
        assert!(matches!(again, Err(SequenceError::AlreadyConnected)));

        ctx.release().await;
        assert_eq!(connector.connects(), 2);
        assert_eq!(connector.closes(), 2);
    }

    #[tokio::test]
    async fn test_insert_requires_connection() {
        let (job, _) = job_with(Arc::new(MemoryConnector::new()));
        let mut ctx = Context::new();
        let result = Insert { job }.execute(&mut ctx, ()).await;
        assert!(matches!(result, Err(SequenceError::NotConnected)));
    }
}
