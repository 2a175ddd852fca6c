//! The remote budgeting API.
//!
//! Everything the program knows about jars and transactions comes through the `Backend` trait.
//! `HttpBackend` talks to the real REST service. `TestBackend` keeps the same resources in memory
//! and is selected with `JARVIEW_IN_TEST_MODE`, so the whole program can run without a server.

mod http_client;
mod test_client;

use crate::model::{Amount, Direction, Jar, JarId, Transaction, TransactionId, TransferRequest};
use crate::{Config, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub(crate) use http_client::HttpBackend;
pub(crate) use test_client::TestBackend;
#[cfg(test)]
pub(crate) use test_client::TestState;

/// The environment variable that switches the program to the in-memory backend.
pub const TEST_MODE_ENV: &str = "JARVIEW_IN_TEST_MODE";

/// The REST surface of the budgeting API.
///
/// Failures are classified with `ErrorType::Network`, `NotFound`, `Validation`,
/// `InsufficientFunds` or `Decode`. Nothing is retried and nothing is validated before sending.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// `GET /jars`
    async fn list_jars(&self) -> Result<Vec<Jar>>;

    /// `GET /jars/{id}`
    async fn get_jar(&self, id: JarId) -> Result<Jar>;

    /// `GET /jars/{id}/balance`
    async fn get_balance(&self, id: JarId) -> Result<Amount>;

    /// `POST /jars/{id}/add` or `POST /jars/{id}/remove` with the amount as the JSON body.
    /// Returns the updated jar.
    async fn adjust_balance(&self, id: JarId, amount: Amount, direction: Direction)
        -> Result<Jar>;

    /// `GET /transactions`
    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// `GET /transactions/{id}`
    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction>;

    /// `POST /transactions` with the transaction as the JSON body.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<Transaction>;

    /// `POST /transactions/transfer` with the request fields as query parameters.
    async fn transfer(&self, request: &TransferRequest) -> Result<Transaction>;

    /// `GET /transactions/jar/{jarId}`
    async fn transactions_for_jar(&self, id: JarId) -> Result<Vec<Transaction>>;

    /// `GET /transactions/daterange?startDate&endDate`, both ends inclusive.
    async fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;
}

/// Which `Backend` implementation to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Talk to the configured base URL.
    #[default]
    Http,
    /// Use an in-memory backend seeded with sample jars.
    Testing,
}

impl Mode {
    /// `Mode::Testing` when `JARVIEW_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Http,
        }
    }
}

/// Creates the `Backend` for `mode`.
pub(crate) fn backend(config: &Config, mode: Mode) -> Result<Arc<dyn Backend>> {
    debug!("Using the {mode:?} backend for {}", config.base_url());
    Ok(match mode {
        Mode::Http => Arc::new(HttpBackend::new(config)?),
        Mode::Testing => Arc::new(TestBackend::new(config.base_url().as_str())),
    })
}

/// Fetches both collections concurrently. Fails if either request fails.
pub(crate) async fn fetch_all(backend: &dyn Backend) -> Result<(Vec<Jar>, Vec<Transaction>)> {
    tokio::try_join!(backend.list_jars(), backend.list_transactions())
}
