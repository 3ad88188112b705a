use crate::backend::Address;
use crate::error::SequenceError;
use std::time::Duration;

/// Settings shared by every sequencing idiom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the backend lives.
    pub address: Address,
    /// Collection the record is inserted into and queried from.
    pub collection: String,
    /// Limit applied to each of connect, insert and find.
    pub step_timeout: Duration,
}

impl Config {
    pub const DEFAULT_COLLECTION: &'static str = "employees";
    pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;

    /// Builds a configuration from raw option values.
    pub fn new(
        address: &str,
        collection: impl Into<String>,
        step_timeout_secs: u64,
    ) -> Result<Self, SequenceError> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(SequenceError::Configuration(
                "collection name must not be empty".to_string(),
            ));
        }
        if step_timeout_secs == 0 {
            return Err(SequenceError::Configuration(
                "step timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            address: Address::parse(address)?,
            collection,
            step_timeout: Duration::from_secs(step_timeout_secs),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: Address::default(),
            collection: Self::DEFAULT_COLLECTION.to_string(),
            step_timeout: Duration::from_secs(Self::DEFAULT_STEP_TIMEOUT_SECS),
        }
    }
}
