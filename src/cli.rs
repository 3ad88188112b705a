//! Command-line surface.

use crate::backend::{Address, Connector, Record};
use crate::config::Config;
use crate::error::SequenceError;
use crate::report::Reporter;
use crate::strategy::{self, Job, Selector, SelectorError};
use clap::Parser;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tsunagi",
    version,
    about = "Connect, insert one record and read it back, sequenced four different ways"
)]
pub struct Cli {
    /// Sequencing idiom (callbacks, promises, generator or async), or `list`
    /// to print the whole collection
    #[arg(value_name = "OPTION", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Backend address, `scheme://host/dataset`
    #[arg(long, env = "TSUNAGI_ADDRESS", default_value = Address::DEFAULT)]
    pub address: String,

    /// Collection to insert into and query
    #[arg(long, env = "TSUNAGI_COLLECTION", default_value = Config::DEFAULT_COLLECTION)]
    pub collection: String,

    /// Seconds each of connect, insert and find may take
    #[arg(long, env = "TSUNAGI_STEP_TIMEOUT", default_value_t = Config::DEFAULT_STEP_TIMEOUT_SECS)]
    pub step_timeout: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    pub fn config(&self) -> Result<Config, SequenceError> {
        Config::new(&self.address, self.collection.as_str(), self.step_timeout)
    }
}

/// What the positional arguments ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Insert a record and read it back with the given idiom.
    Run(Selector),
    /// Read back every record of the collection.
    List,
}

impl Command {
    /// Accepts exactly one argument: a selector or `list`.
    pub fn from_args(args: &[String]) -> Result<Self, SelectorError> {
        match args {
            [] => Err(SelectorError::Missing),
            [arg] if arg == "list" => Ok(Command::List),
            [arg] => arg.parse().map(Command::Run),
            [_, rest @ ..] => Err(SelectorError::Unexpected(rest.to_vec())),
        }
    }
}

/// How a command-line invocation ended.
#[derive(Debug)]
pub enum Outcome {
    /// The arguments were missing, unknown or too many; usage was printed.
    Usage,
    /// The run completed with the records found.
    Succeeded(Vec<Record>),
    /// The run failed; the error was printed.
    Failed(SequenceError),
}

/// Runs the invocation described by `cli`.
///
/// Only an invalid configuration is returned as an error. A bad selector and
/// a failed run have both been reported by the time this returns.
pub async fn run(
    cli: &Cli,
    connector: Arc<dyn Connector>,
    reporter: Arc<dyn Reporter>,
) -> Result<Outcome, SequenceError> {
    let command = match Command::from_args(&cli.args) {
        Ok(command) => command,
        Err(problem) => {
            debug!("Rejected arguments {:?}: {}", cli.args, problem);
            reporter.usage(&problem);
            return Ok(Outcome::Usage);
        }
    };

    let config = cli.config()?;
    let job = Job::new(connector, reporter, &config);
    let outcome = match command {
        Command::Run(selector) => {
            let job = job.with_record(selector.default_record());
            strategy::run(selector, &job).await
        }
        Command::List => strategy::list(&job).await,
    };

    Ok(match outcome {
        Ok(records) => Outcome::Succeeded(records),
        Err(e) => Outcome::Failed(e),
    })
}
