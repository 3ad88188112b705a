//! Continuation-passing tasks.
//!
//! A task receives the previous value together with a [`Next`] callback and
//! reports its outcome by calling it. [`task`] turns such a function into a
//! [`Step`], so a list of tasks runs on a [`Sequence`](crate::Sequence) like
//! any other steps.

use crate::backend::SharedConnection;
use crate::context::Context;
use crate::error::SequenceError;
use crate::step::{Step, StepConfig, StepName};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Completion callback handed to a task.
///
/// Calling it consumes it, so a task reports at most once. Dropping it
/// without a call fails the step with [`SequenceError::Abandoned`].
pub struct Next<T> {
    sender: oneshot::Sender<Result<T, SequenceError>>,
}

impl<T> fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

impl<T> Next<T> {
    /// Reports the task's outcome.
    pub fn call(self, result: Result<T, SequenceError>) {
        // The receiver only disappears when the step was timed out.
        let _ = self.sender.send(result);
    }

    pub fn ok(self, value: T) {
        self.call(Ok(value));
    }

    pub fn err(self, error: SequenceError) {
        self.call(Err(error));
    }
}

/// A continuation-passing function wrapped as a [`Step`].
pub struct Task<I, O, F> {
    name: StepName,
    config: StepConfig,
    f: F,
    _io: PhantomData<fn(I) -> O>,
}

impl<I, O, F> fmt::Debug for Task<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

/// Wraps `f` as a step named `name`.
///
/// # Examples
///
/// ```
/// use tsunagi::prelude::*;
/// use tsunagi::waterfall::{task, Next};
/// use futures_util::FutureExt;
///
/// # tokio_test::block_on(async {
/// let sequence = SequenceBuilder::new()
///     .first(task("seed", |(), next: Next<i64>| async move { next.ok(20) }.boxed()))
///     .then(task("add", |n: i64, next: Next<i64>| async move { next.ok(n + 22) }.boxed()))
///     .build();
///
/// assert_eq!(sequence.run(()).await.unwrap(), 42);
/// # });
/// ```
pub fn task<I, O, F>(name: impl Into<StepName>, f: F) -> Task<I, O, F>
where
    F: Fn(I, Next<O>) -> BoxFuture<'static, ()> + Send + Sync,
{
    Task {
        name: name.into(),
        config: StepConfig::default(),
        f,
        _io: PhantomData,
    }
}

impl<I, O, F> Task<I, O, F> {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config = StepConfig::with_timeout(timeout);
        self
    }
}

#[async_trait]
impl<I, O, F> Step for Task<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, Next<O>) -> BoxFuture<'static, ()> + Send + Sync,
{
    type Input = I;
    type Output = O;

    async fn execute(&self, _ctx: &mut Context, input: I) -> Result<O, SequenceError> {
        let (sender, receiver) = oneshot::channel();
        (self.f)(input, Next { sender }).await;
        receiver.await.map_err(|_| SequenceError::Abandoned {
            step_name: self.name.clone(),
        })?
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }

    fn config(&self) -> StepConfig {
        self.config.clone()
    }
}

/// Parks the connection produced by `step` in the run's context.
///
/// Tasks cannot reach the context, so the connecting task only passes the
/// connection on; this adapter gives the context its share so that
/// [`Sequence::run`](crate::Sequence::run) closes it at the end of the run.
pub fn acquire<S>(step: S) -> Acquire<S>
where
    S: Step<Output = SharedConnection>,
{
    Acquire { step }
}

#[derive(Debug)]
pub struct Acquire<S> {
    step: S,
}

#[async_trait]
impl<S> Step for Acquire<S>
where
    S: Step<Output = SharedConnection>,
{
    type Input = S::Input;
    type Output = SharedConnection;

    async fn execute(
        &self,
        ctx: &mut Context,
        input: S::Input,
    ) -> Result<SharedConnection, SequenceError> {
        let connection = self.step.execute(ctx, input).await?;
        ctx.acquire(Arc::clone(&connection)).await?;
        Ok(connection)
    }

    fn name(&self) -> StepName {
        self.step.name()
    }

    fn config(&self) -> StepConfig {
        self.step.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Address, Connector};
    use crate::memory::MemoryConnector;
    use crate::sequence::SequenceBuilder;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_task_threads_values() {
        let sequence = SequenceBuilder::new()
            .first(task("words", |(), next: Next<Vec<&'static str>>| {
                async move { next.ok(vec!["a", "b", "c"]) }.boxed()
            }))
            .then(task("count", |words: Vec<&'static str>, next: Next<usize>| {
                async move { next.ok(words.len()) }.boxed()
            }))
            .build();

        assert_eq!(sequence.run(()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_task_error_short_circuits() {
        let later = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later);

        let sequence = SequenceBuilder::new()
            .first(task("fail", |(), next: Next<u8>| {
                async move { next.err(SequenceError::Configuration("boom".to_string())) }.boxed()
            }))
            .then(task("later", move |n: u8, next: Next<u8>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    next.ok(n)
                }
                .boxed()
            }))
            .build();

        let result = sequence.run(()).await;
        assert!(matches!(result, Err(SequenceError::Configuration(_))));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_next_is_abandoned() {
        let sequence = SequenceBuilder::new()
            .first(task("silent", |(), next: Next<()>| {
                async move { drop(next) }.boxed()
            }))
            .build();

        match sequence.run(()).await {
            Err(SequenceError::Abandoned { step_name }) => assert_eq!(step_name, "silent"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_next_called_from_spawned_task() {
        let sequence = SequenceBuilder::new()
            .first(task("later", |(), next: Next<&'static str>| {
                async move {
                    let _handle = tokio::spawn(async move { next.ok("called back") });
                }
                .boxed()
            }))
            .build();

        assert_eq!(sequence.run(()).await.unwrap(), "called back");
    }

    #[tokio::test]
    async fn test_task_timeout() {
        let sequence = SequenceBuilder::new()
            .first(
                task("hang", |(), next: Next<()>| {
                    async move {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        next.ok(())
                    }
                    .boxed()
                })
                .with_timeout(Duration::from_millis(10)),
            )
            .build();

        assert!(matches!(
            sequence.run(()).await,
            Err(SequenceError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_acquire_hands_connection_to_context() {
        let connector = Arc::new(MemoryConnector::new());
        let dialer = Arc::clone(&connector);

        let sequence = SequenceBuilder::new()
            .first(acquire(task(
                "connect",
                move |(), next: Next<SharedConnection>| {
                    let dialer = Arc::clone(&dialer);
                    async move {
                        let result = dialer
                            .connect(&Address::default())
                            .await
                            .map_err(|source| SequenceError::Connect {
                                address: Address::DEFAULT.to_string(),
                                source,
                            });
                        next.call(result)
                    }
                    .boxed()
                },
            )))
            .build();

        let mut ctx = Context::new();
        sequence.execute(&mut ctx, ()).await.unwrap();
        assert!(ctx.is_connected());

        ctx.release().await;
        assert_eq!(connector.connects(), 1);
        assert_eq!(connector.closes(), 1);
    }
}
