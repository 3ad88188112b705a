use crate::step::StepName;
use thiserror::Error;

/// Failures reported by a storage backend.
///
/// The sequencer never inspects these beyond displaying them; they are
/// wrapped in the [`SequenceError`] variant for the operation that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend could not be reached at the given host.
    #[error("connection refused by {host}")]
    Unreachable {
        /// Host named in the connection address
        host: String,
    },

    /// The backend refused the operation.
    #[error("{0}")]
    Rejected(String),

    /// The connection was used after it had been closed.
    #[error("connection is closed")]
    Closed,
}

/// Errors that can end a sequenced run.
///
/// A run reports at most one of these: the first failure stops the
/// sequence and no later step is started.
///
/// # Non-Exhaustive
///
/// Match with a wildcard arm:
///
/// ```
/// use tsunagi::SequenceError;
///
/// fn label(error: &SequenceError) -> &'static str {
///     match error {
///         SequenceError::Connect { .. } => "connect",
///         SequenceError::Insert { .. } => "insert",
///         SequenceError::Query { .. } => "query",
///         _ => "other",
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SequenceError {
    /// The backend could not be connected to.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// The address that was dialled
        address: String,
        /// Underlying backend failure
        #[source]
        source: BackendError,
    },

    /// The insert was rejected.
    #[error("insert into '{collection}' failed: {source}")]
    Insert {
        /// Target collection
        collection: String,
        /// Underlying backend failure
        #[source]
        source: BackendError,
    },

    /// The query was rejected.
    #[error("query on '{collection}' failed: {source}")]
    Query {
        /// Queried collection
        collection: String,
        /// Underlying backend failure
        #[source]
        source: BackendError,
    },

    /// A step exceeded its configured timeout.
    #[error("Timeout occurred in step: {step_name}")]
    Timeout {
        /// The name of the step that timed out
        step_name: StepName,
    },

    /// A step needed the connection before one was acquired.
    #[error("no connection has been acquired")]
    NotConnected,

    /// A second connection was acquired in the same run.
    #[error("a connection is already held by this run")]
    AlreadyConnected,

    /// A step received a value of the wrong type from its predecessor.
    #[error("Step '{step_name}' received an input of the wrong type")]
    TypeMismatch {
        /// The step whose input did not match
        step_name: StepName,
    },

    /// A continuation-style task finished without calling its `Next` callback.
    #[error("Step '{step_name}' dropped its continuation without reporting")]
    Abandoned {
        /// The step whose task abandoned the run
        step_name: StepName,
    },

    /// The run configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}
