use crate::context::Context;
use crate::error::SequenceError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Name of a step, used in logs and in [`SequenceError`] variants.
///
/// ```
/// use tsunagi::StepName;
///
/// let name: StepName = "find".into();
/// assert_eq!(name.as_str(), "find");
/// assert_eq!(name, "find");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepName(String);

impl StepName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Last path segment of `T`'s type name.
    fn of<T: ?Sized>() -> Self {
        let path = std::any::type_name::<T>();
        Self::new(path.rsplit("::").next().unwrap_or(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Configuration for a single step.
///
/// # Examples
///
/// ```
/// use tsunagi::StepConfig;
/// use std::time::Duration;
///
/// let config = StepConfig::with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    /// Maximum time the step may stay pending. `None` waits indefinitely.
    /// Default: 30 seconds.
    pub timeout: Option<Duration>,
}

impl StepConfig {
    /// Default per-step timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }
}

/// One unit of asynchronous work in a [`Sequence`](crate::Sequence).
///
/// A step receives the previous step's output as its input and produces the
/// value handed to the next step. The first step of a sequence usually takes
/// `()`.
///
/// # Examples
///
/// ```
/// use tsunagi::prelude::*;
/// use async_trait::async_trait;
///
/// struct Double;
///
/// #[async_trait]
/// impl Step for Double {
///     type Input = i64;
///     type Output = i64;
///
///     async fn execute(&self, _ctx: &mut Context, input: i64) -> Result<i64, SequenceError> {
///         Ok(input * 2)
///     }
///
///     fn name(&self) -> StepName {
///         StepName::new("double")
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Value received from the previous step.
    type Input: Send + 'static;

    /// Value handed to the next step.
    type Output: Send + 'static;

    /// Executes the step.
    ///
    /// Returning `Err` stops the sequence; no later step runs.
    async fn execute(
        &self,
        ctx: &mut Context,
        input: Self::Input,
    ) -> Result<Self::Output, SequenceError>;

    /// Returns the step name.
    ///
    /// By default, uses the type name. Override to provide a custom name.
    fn name(&self) -> StepName {
        StepName::of::<Self>()
    }

    /// Returns the step configuration.
    fn config(&self) -> StepConfig {
        StepConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Increment;

    #[async_trait]
    impl Step for Increment {
        type Input = u32;
        type Output = u32;

        async fn execute(&self, _ctx: &mut Context, input: u32) -> Result<u32, SequenceError> {
            Ok(input + 1)
        }
    }

    #[tokio::test]
    async fn test_step_execution() {
        let mut ctx = Context::new();
        let result = Increment.execute(&mut ctx, 41).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_step_name_from_type() {
        assert_eq!(Increment.name(), StepName::new("Increment"));
    }

    #[test]
    fn test_step_config_default() {
        let config = Increment.config();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_step_name_display() {
        let name = StepName::from("connect");
        assert_eq!(name.to_string(), "connect");
        assert_eq!(name, "connect");
    }
}
