//! Screen state for the dashboard and the transactions list.
//!
//! Each screen is a plain struct changed through typed action methods. Actions that talk to the
//! backend take a `&dyn Backend`. Data is fetched in full on load and again after every successful
//! change. Failures are turned into a short message stored on the screen and logged with their
//! full context.

mod dashboard;
mod fetch;
mod forms;
pub mod render;
mod transactions;

pub use dashboard::DashboardState;
pub use fetch::{FetchGuard, Ticket};
pub use forms::{BalanceForm, TransferForm};
pub use transactions::TransactionsState;

/// Shown when loading jars or transactions fails.
pub const FETCH_FAILED: &str = "Failed to fetch data";
/// Shown when creating a transfer fails.
pub const TRANSFER_FAILED: &str = "Failed to create transaction";
