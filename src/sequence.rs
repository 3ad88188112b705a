use crate::context::Context;
use crate::error::SequenceError;
use crate::step::{Step, StepConfig, StepName};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use tokio::time::timeout;
use tracing::{debug, info, warn};

type Value = Box<dyn Any + Send>;

#[async_trait]
trait ErasedStep: Send + Sync {
    fn name(&self) -> StepName;

    fn config(&self) -> StepConfig;

    async fn execute_erased(&self, ctx: &mut Context, input: Value) -> Result<Value, SequenceError>;
}

struct StepEntry<S> {
    step: S,
}

#[async_trait]
impl<S: Step> ErasedStep for StepEntry<S> {
    fn name(&self) -> StepName {
        self.step.name()
    }

    fn config(&self) -> StepConfig {
        self.step.config()
    }

    async fn execute_erased(&self, ctx: &mut Context, input: Value) -> Result<Value, SequenceError> {
        let input = input
            .downcast::<S::Input>()
            .map_err(|_| SequenceError::TypeMismatch {
                step_name: self.step.name(),
            })?;
        let output = self.step.execute(ctx, *input).await?;
        Ok(Box::new(output))
    }
}

/// An ordered list of dependent steps.
///
/// Each step's output is the next step's input. Steps run one at a time in
/// the order they were added; the first failure ends the run and no later
/// step is started.
pub struct Sequence<I, O> {
    steps: Vec<Box<dyn ErasedStep>>,
    _io: PhantomData<fn(I) -> O>,
}

impl<I, O> fmt::Debug for Sequence<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<I, O> Sequence<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a new sequence builder.
    pub fn builder() -> SequenceBuilder<(), ()> {
        SequenceBuilder::new()
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`: a sequence cannot be built without a step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step against `ctx`.
    ///
    /// The connection acquired along the way is left in `ctx`; use
    /// [`run`](Sequence::run) to have it released before the outcome is
    /// returned.
    pub async fn execute(&self, ctx: &mut Context, input: I) -> Result<O, SequenceError> {
        let mut value: Value = Box::new(input);

        for step in &self.steps {
            value = Self::execute_step(step.as_ref(), ctx, value).await?;
            ctx.record_completed();
        }

        value
            .downcast::<O>()
            .map(|output| *output)
            .map_err(|_| SequenceError::TypeMismatch {
                step_name: self
                    .steps
                    .last()
                    .map(|s| s.name())
                    .unwrap_or_else(|| StepName::new("output")),
            })
    }

    /// Runs the sequence in a fresh context and releases its connection, on
    /// success and on failure, before returning the outcome.
    pub async fn run(&self, input: I) -> Result<O, SequenceError> {
        let mut ctx = Context::new();
        let outcome = self.execute(&mut ctx, input).await;
        ctx.release().await;
        outcome
    }

    async fn execute_step(
        step: &dyn ErasedStep,
        ctx: &mut Context,
        input: Value,
    ) -> Result<Value, SequenceError> {
        let name = step.name();
        debug!("Starting step '{}'", name);

        let result = match step.config().timeout {
            Some(limit) => match timeout(limit, step.execute_erased(ctx, input)).await {
                Ok(result) => result,
                Err(_) => Err(SequenceError::Timeout {
                    step_name: name.clone(),
                }),
            },
            None => step.execute_erased(ctx, input).await,
        };

        match &result {
            Ok(_) => info!("Step '{}' completed successfully", name),
            Err(e) => warn!("Step '{}' failed: {}", name, e),
        }
        result
    }
}

/// Builder for [`Sequence`].
///
/// The builder tracks the input of the first step and the output of the last
/// one, so a step whose input does not match its predecessor's output does
/// not compile:
///
/// ```compile_fail
/// use tsunagi::prelude::*;
/// use async_trait::async_trait;
///
/// struct Count;
///
/// #[async_trait]
/// impl Step for Count {
///     type Input = ();
///     type Output = usize;
///     async fn execute(&self, _: &mut Context, _: ()) -> Result<usize, SequenceError> {
///         Ok(1)
///     }
/// }
///
/// struct Shout;
///
/// #[async_trait]
/// impl Step for Shout {
///     type Input = String;
///     type Output = String;
///     async fn execute(&self, _: &mut Context, s: String) -> Result<String, SequenceError> {
///         Ok(s.to_uppercase())
///     }
/// }
///
/// let sequence = SequenceBuilder::new().first(Count).then(Shout).build();
/// ```
pub struct SequenceBuilder<I, O> {
    steps: Vec<Box<dyn ErasedStep>>,
    _io: PhantomData<fn(I) -> O>,
}

impl Default for SequenceBuilder<(), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceBuilder<(), ()> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            _io: PhantomData,
        }
    }

    /// Adds the first step; its input becomes the sequence's input.
    pub fn first<S: Step + 'static>(self, step: S) -> SequenceBuilder<S::Input, S::Output> {
        SequenceBuilder {
            steps: vec![Box::new(StepEntry { step })],
            _io: PhantomData,
        }
    }
}

impl<I, O> SequenceBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends a step fed by the current last step.
    pub fn then<S>(mut self, step: S) -> SequenceBuilder<I, S::Output>
    where
        S: Step<Input = O> + 'static,
    {
        self.steps.push(Box::new(StepEntry { step }));
        SequenceBuilder {
            steps: self.steps,
            _io: PhantomData,
        }
    }

    pub fn build(self) -> Sequence<I, O> {
        Sequence {
            steps: self.steps,
            _io: PhantomData,
        }
    }
}
