//! Command handlers for the jarview CLI.
//!
//! This module contains implementations for all CLI subcommands. The MCP tools call the same
//! handlers.

mod dashboard;
mod init;
mod jars;
mod mcp;
mod transactions;

use crate::error::{Error, ErrorType};
use crate::Result;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use tracing::{debug, warn};

pub use dashboard::{dashboard, history, Dashboard};
pub use init::init;
pub use jars::{adjust, balance, jar, jars, Balance};
pub use mcp::mcp;
pub use transactions::{transaction, transactions, transfer};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to stdout and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        println!("{}", self.message.trim_end());
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Runs `future` unless Ctrl-C arrives first, in which case the future is dropped, which aborts
/// any request it has in flight.
pub(crate) async fn interruptible<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        result = future => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning the request");
            Err(Error::msg(ErrorType::Internal, "Interrupted"))
        }
    }
}
