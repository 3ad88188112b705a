//! Progress output.
//!
//! Reporting is a side effect between steps: a write that fails is logged
//! and never changes the outcome of a run.

use crate::backend::{InsertOutcome, Record};
use crate::error::SequenceError;
use crate::strategy::{Selector, SelectorError};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Program name shown in the usage text.
pub const PROGRAM: &str = "tsunagi";

/// Receives the events of a run.
pub trait Reporter: Send + Sync {
    /// The insert step succeeded.
    fn inserted(&self, outcome: &InsertOutcome);

    /// The query step succeeded.
    fn found(&self, records: &[Record]);

    /// The run produced a terminal message after its last step.
    fn finished(&self, message: &str);

    /// The run failed.
    fn failed(&self, error: &SequenceError);

    /// The selector argument was missing or unknown.
    fn usage(&self, problem: &SelectorError);
}

/// Line-oriented reporter writing to any [`Write`] sink, stdout by default.
///
/// # Examples
///
/// ```
/// use tsunagi::{ConsoleReporter, InsertOutcome, Reporter};
///
/// let reporter = ConsoleReporter::buffer();
/// reporter.inserted(&InsertOutcome { inserted_id: 3, id: 1 });
/// assert_eq!(reporter.contents(), "Result of insert: 3\n");
/// ```
pub struct ConsoleReporter<W = io::Stdout> {
    out: Mutex<W>,
}

impl<W> fmt::Debug for ConsoleReporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter").finish_non_exhaustive()
    }
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl ConsoleReporter<Vec<u8>> {
    /// A reporter collecting its output in memory.
    pub fn buffer() -> Self {
        Self::new(Vec::new())
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        let out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", args).and_then(|()| out.flush()) {
            warn!("Failed to write report: {}", e);
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn inserted(&self, outcome: &InsertOutcome) {
        self.line(format_args!("Result of insert: {}", outcome.inserted_id));
    }

    fn found(&self, records: &[Record]) {
        match serde_json::to_string(records) {
            Ok(json) => self.line(format_args!("Result of find: {}", json)),
            Err(e) => self.line(format_args!("Result of find: {:?} ({})", records, e)),
        }
    }

    fn finished(&self, message: &str) {
        self.line(format_args!("{}", message));
    }

    fn failed(&self, error: &SequenceError) {
        self.line(format_args!("ERROR {}", error));
    }

    fn usage(&self, problem: &SelectorError) {
        self.line(format_args!("{}", problem));
        for line in Selector::usage(PROGRAM) {
            self.line(format_args!("{}", line));
        }
    }
}
