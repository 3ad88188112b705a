//! Commonly used types and traits

pub use crate::backend::{Connection, Connector, Filter, InsertOutcome, Record};
pub use crate::context::Context;
pub use crate::error::SequenceError;
pub use crate::sequence::{Sequence, SequenceBuilder};
pub use crate::step::{Step, StepConfig, StepName};
