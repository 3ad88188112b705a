//! Storage backend seam.
//!
//! The sequencer sees the backend only through [`Connector`] and
//! [`Connection`]: connect, insert one record, find records, close.

use crate::error::{BackendError, SequenceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A connection shared between the run's context and the steps using it.
pub type SharedConnection = Arc<dyn Connection>;

/// The record exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub name: String,
}

impl Record {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// What the backend reports back after storing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// Key assigned by the backend to the stored document.
    pub inserted_id: u64,
    /// Identifier field of the stored record.
    pub id: i64,
}

/// Query predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Every record in the collection.
    All,
    /// Records whose `id` field equals the value.
    Id(i64),
}

impl Filter {
    /// Filter selecting the record described by an insert outcome.
    pub fn inserted(outcome: &InsertOutcome) -> Self {
        Filter::Id(outcome.id)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => record.id == *id,
        }
    }
}

/// A connection descriptor of the form `scheme://host/dataset`.
///
/// # Examples
///
/// ```
/// use tsunagi::Address;
///
/// let address = Address::parse("mongodb://localhost/playground")?;
/// assert_eq!(address.host(), "localhost");
/// assert_eq!(address.dataset(), "playground");
/// # Ok::<(), tsunagi::SequenceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    scheme: String,
    host: String,
    dataset: String,
}

impl Address {
    /// Address used by the demos when none is configured.
    pub const DEFAULT: &'static str = "mongodb://localhost/playground";

    pub fn parse(raw: &str) -> Result<Self, SequenceError> {
        let invalid = |reason: &str| {
            SequenceError::Configuration(format!("invalid address '{raw}': {reason}"))
        };

        let (scheme, rest) = raw.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }
        let (host, dataset) = rest.split_once('/').ok_or_else(|| invalid("missing dataset"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let dataset = dataset.trim_end_matches('/');
        if dataset.is_empty() || dataset.contains('/') {
            return Err(invalid("dataset must be a single path segment"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            dataset: dataset.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

impl Default for Address {
    fn default() -> Self {
        Self {
            scheme: "mongodb".to_string(),
            host: "localhost".to_string(),
            dataset: "playground".to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.host, self.dataset)
    }
}

impl std::str::FromStr for Address {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Opens connections to a backend.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &Address) -> Result<SharedConnection, BackendError>;
}

/// An open connection to one dataset of the backend.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Stores one record in `collection`.
    async fn insert(&self, collection: &str, record: Record)
        -> Result<InsertOutcome, BackendError>;

    /// Returns the records of `collection` matching `filter`, in insertion order.
    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, BackendError>;

    /// Closes the connection. Later operations fail with [`BackendError::Closed`].
    async fn close(&self) -> Result<(), BackendError>;
}

/// Closes `connection`, logging instead of returning a failure.
pub(crate) async fn close_logged(connection: SharedConnection) {
    match connection.close().await {
        Ok(()) => debug!("Connection closed"),
        Err(e) => warn!("Error while closing connection: {}", e),
    }
}
