//! The records exchanged with the budgeting API: `Jar`, `Transaction` and `TransferRequest`.
mod amount;
mod jar;
mod transaction;

pub use amount::{Amount, AmountError};
pub use jar::{find_jar, Direction, Jar, JarId};
pub use transaction::{
    default_transfer_description, format_timestamp, parse_date, parse_timestamp, Transaction,
    TransactionId, TransferRequest,
};
