//! # Tsunagi (繋ぎ)
//!
//! Four ways to sequence dependent asynchronous calls.
//!
//! "Tsunagi" (繋ぎ) means "a link" or "a joint" in Japanese: each step of a
//! run is joined to the next, and a run only moves on once the previous link
//! holds.
//!
//! The crate connects to a document store, inserts a record and reads it back,
//! and does so with four different idioms chosen on the command line:
//!
//! - **callbacks**: an ordered list of [`Step`]s run by a [`Sequence`]
//! - **promises**: future combinators (`and_then`, `inspect_ok`)
//! - **generator**: straight-line `async` code
//! - **async**: continuation-passing tasks run as a [`waterfall`]
//!
//! A fifth command, `list`, connects and prints the whole collection.
//!
//! All four share one contract. Steps run one at a time in declared order,
//! each fed by its predecessor's output. The first failure ends the run. A
//! connection that was opened is closed before the outcome is reported.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsunagi::prelude::*;
//! use async_trait::async_trait;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Step for Greet {
//!     type Input = ();
//!     type Output = String;
//!
//!     async fn execute(&self, _ctx: &mut Context, _input: ()) -> Result<String, SequenceError> {
//!         Ok("Hello".to_string())
//!     }
//! }
//!
//! struct Shout;
//!
//! #[async_trait]
//! impl Step for Shout {
//!     type Input = String;
//!     type Output = String;
//!
//!     async fn execute(&self, _ctx: &mut Context, input: String) -> Result<String, SequenceError> {
//!         Ok(format!("{}!", input.to_uppercase()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sequence = SequenceBuilder::new().first(Greet).then(Shout).build();
//! assert_eq!(sequence.run(()).await.unwrap(), "HELLO!");
//! # }
//! ```
//!
//! ## Running an idiom against the in-memory store
//!
//! ```rust
//! use std::sync::Arc;
//! use tsunagi::{strategy, Config, ConsoleReporter, Job, MemoryConnector, Selector};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let reporter = Arc::new(ConsoleReporter::buffer());
//! let job = Job::new(
//!     Arc::new(MemoryConnector::new()),
//!     reporter.clone(),
//!     &Config::default(),
//! )
//! .with_record(Selector::Generator.default_record());
//!
//! let records = strategy::run(Selector::Generator, &job).await.unwrap();
//! assert_eq!(records[0].name, "C. Generator");
//! assert!(reporter.contents().starts_with("Result of insert: 1"));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use std::sync::Arc;
//! use tsunagi::{strategy, Config, ConsoleReporter, Job, MemoryConnector, SequenceError, Selector};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let connector = Arc::new(MemoryConnector::new().reject_inserts("duplicate key"));
//! let job = Job::new(
//!     connector.clone(),
//!     Arc::new(ConsoleReporter::buffer()),
//!     &Config::default(),
//! )
//! .with_record(Selector::Promises.default_record());
//!
//! match strategy::run(Selector::Promises, &job).await {
//!     Err(SequenceError::Insert { collection, source }) => {
//!         eprintln!("insert into {} failed: {}", collection, source);
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! assert_eq!(connector.finds(), 0);
//! assert_eq!(connector.closes(), 1);
//! # }
//! ```

mod backend;
mod config;
mod context;
mod error;
mod memory;
mod report;
mod sequence;
mod step;

pub mod cli;
pub mod prelude;
pub mod strategy;
pub mod waterfall;

pub use backend::{Address, Connection, Connector, Filter, InsertOutcome, Record, SharedConnection};
pub use config::Config;
pub use context::Context;
pub use error::{BackendError, SequenceError};
pub use memory::MemoryConnector;
pub use report::{ConsoleReporter, Reporter, PROGRAM};
pub use sequence::{Sequence, SequenceBuilder};
pub use step::{Step, StepConfig, StepName};
pub use strategy::{Job, Selector, SelectorError};
