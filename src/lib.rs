//! jarview: a terminal dashboard for money jars kept by a remote budgeting API.
//!
//! The library is split into the `api` client, the `model` records, the `series` engine that
//! derives chart datasets, and the `views` that hold screen state and render it. `commands` ties
//! them together for the CLI and the MCP server.

mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
mod mcp;
pub mod model;
pub mod series;
mod utils;
pub mod views;

#[cfg(test)]
mod test;

pub use api::{Backend, Mode, TEST_MODE_ENV};
pub use config::{Config, DEFAULT_BASE_URL};
pub use error::{Error, ErrorType, Result};
