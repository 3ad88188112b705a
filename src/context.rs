use crate::backend::{self, SharedConnection};
use crate::error::SequenceError;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-run state shared by the steps of a sequence.
///
/// The context owns the run's connection from the moment a step acquires it
/// until [`release`](Context::release) closes it. Releasing is idempotent: the
/// connection is taken out of the slot before it is closed, so a second call
/// finds nothing to close.
pub struct Context {
    connection: Option<SharedConnection>,
    completed_steps: usize,
    started_at: Instant,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("connected", &self.connection.is_some())
            .field("completed_steps", &self.completed_steps)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            connection: None,
            completed_steps: 0,
            started_at: Instant::now(),
        }
    }

    /// Hands a freshly opened connection to the run.
    ///
    /// A run holds a single connection. Acquiring a second one is an error:
    /// the first stays in place and the rejected one is closed.
    pub async fn acquire(&mut self, connection: SharedConnection) -> Result<(), SequenceError> {
        if self.connection.is_some() {
            backend::close_logged(connection).await;
            return Err(SequenceError::AlreadyConnected);
        }
        self.connection = Some(connection);
        Ok(())
    }

    /// Returns the run's connection.
    pub fn connection(&self) -> Result<&SharedConnection, SequenceError> {
        self.connection.as_ref().ok_or(SequenceError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Closes the connection if one is held. Returns `true` if this call
    /// closed it.
    ///
    /// A failing close is logged and otherwise ignored; it never changes the
    /// outcome of the run.
    pub async fn release(&mut self) -> bool {
        let Some(connection) = self.connection.take() else {
            return false;
        };
        debug!("Releasing connection after {:?}", self.elapsed());
        backend::close_logged(connection).await;
        true
    }

    /// Number of steps that completed successfully in this run.
    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    pub(crate) fn record_completed(&mut self) {
        self.completed_steps += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
