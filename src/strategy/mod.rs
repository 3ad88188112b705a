//! The four ways of sequencing connect, insert and find.
//!
//! Every strategy honours the same contract: the insert starts only after the
//! connect succeeded, the find only after the insert succeeded and filters by
//! the identifier the insert reported, the first failure ends the run, and a
//! connection that was opened is closed before the outcome is returned.

mod callbacks;
mod generator;
mod promises;
mod waterfall;

use crate::backend::{self, Address, Connector, Filter, InsertOutcome, Record, SharedConnection};
use crate::config::Config;
use crate::error::SequenceError;
use crate::report::Reporter;
use crate::step::StepName;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// The command-line argument choosing a sequencing idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Ordered list of steps run by a [`Sequence`](crate::Sequence).
    Callbacks,
    /// Future combinators chained with `and_then`.
    Promises,
    /// Straight-line `async` code suspended at every `.await`.
    Generator,
    /// Continuation-passing tasks run as a waterfall.
    Async,
}

impl Selector {
    pub const ALL: [Selector; 4] = [
        Selector::Callbacks,
        Selector::Promises,
        Selector::Generator,
        Selector::Async,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Selector::Callbacks => "callbacks",
            Selector::Promises => "promises",
            Selector::Generator => "generator",
            Selector::Async => "async",
        }
    }

    /// The record each idiom inserts when run from the command line.
    pub fn default_record(&self) -> Record {
        let name = match self {
            Selector::Callbacks => "A. Callback",
            Selector::Promises => "B. Promises",
            Selector::Generator => "C. Generator",
            Selector::Async => "D. Async",
        };
        Record::new(1, name)
    }

    /// The two usage lines listing every option.
    pub fn usage(program: &str) -> [String; 2] {
        let options = Self::ALL.map(|s| s.as_str()).join(", ");
        [
            format!("Usage: {program} <option>"),
            format!("Where option is one of: {options}"),
        ]
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|selector| selector.as_str() == s)
            .ok_or_else(|| SelectorError::Invalid(s.to_string()))
    }
}

/// Why the selector argument could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Incorrect number of arguments")]
    Missing,

    /// Arguments left over after the selector.
    #[error("Incorrect number of arguments")]
    Unexpected(Vec<String>),

    #[error("Invalid option: {0}")]
    Invalid(String),
}

/// Everything one run needs: where to connect, what to insert, and where to
/// report progress. A job without a record can only [`list`].
#[derive(Clone)]
pub struct Job {
    connector: Arc<dyn Connector>,
    reporter: Arc<dyn Reporter>,
    address: Address,
    collection: String,
    record: Option<Record>,
    step_timeout: Duration,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("address", &self.address)
            .field("collection", &self.collection)
            .field("record", &self.record)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl Job {
    pub fn new(
        connector: Arc<dyn Connector>,
        reporter: Arc<dyn Reporter>,
        config: &Config,
    ) -> Self {
        Self {
            connector,
            reporter,
            address: config.address.clone(),
            collection: config.collection.clone(),
            record: None,
            step_timeout: config.step_timeout,
        }
    }

    /// Sets the record the insert step writes.
    pub fn with_record(mut self, record: Record) -> Self {
        self.record = Some(record);
        self
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    async fn connect(&self) -> Result<SharedConnection, SequenceError> {
        self.connector
            .connect(&self.address)
            .await
            .map_err(|source| SequenceError::Connect {
                address: self.address.to_string(),
                source,
            })
    }

    async fn insert(&self, connection: &SharedConnection) -> Result<InsertOutcome, SequenceError> {
        let record = self
            .record
            .clone()
            .ok_or_else(|| SequenceError::Configuration("no record to insert".to_string()))?;
        connection
            .insert(&self.collection, record)
            .await
            .map_err(|source| SequenceError::Insert {
                collection: self.collection.clone(),
                source,
            })
    }

    async fn find(
        &self,
        connection: &SharedConnection,
        filter: Filter,
    ) -> Result<Vec<Record>, SequenceError> {
        connection
            .find(&self.collection, filter)
            .await
            .map_err(|source| SequenceError::Query {
                collection: self.collection.clone(),
                source,
            })
    }

    async fn release(&self, connection: SharedConnection) {
        backend::close_logged(connection).await;
    }

    /// Applies the step timeout to an operation run outside a sequence.
    async fn bounded<T>(
        &self,
        step: &str,
        operation: impl Future<Output = Result<T, SequenceError>>,
    ) -> Result<T, SequenceError> {
        tokio::time::timeout(self.step_timeout, operation)
            .await
            .unwrap_or_else(|_| {
                Err(SequenceError::Timeout {
                    step_name: StepName::new(step),
                })
            })
    }
}

/// Runs `job` with the chosen idiom.
///
/// A failure is reported once, here, after the connection has been released.
pub async fn run(selector: Selector, job: &Job) -> Result<Vec<Record>, SequenceError> {
    info!("Running the '{}' sequence against {}", selector, job.address);

    let outcome = match selector {
        Selector::Callbacks => callbacks::run(job).await,
        Selector::Promises => promises::run(job).await,
        Selector::Generator => generator::run(job).await,
        Selector::Async => waterfall::run(job).await,
    };

    if let Err(e) = &outcome {
        job.reporter().failed(e);
    }
    outcome
}

/// Reads back every record of the job's collection: connect, find all, close.
///
/// Failures are reported the same way as in [`run`].
pub async fn list(job: &Job) -> Result<Vec<Record>, SequenceError> {
    info!("Listing '{}' at {}", job.collection, job.address);

    let outcome = callbacks::list(job).await;
    if let Err(e) = &outcome {
        job.reporter().failed(e);
    }
    outcome
}
