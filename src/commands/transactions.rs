//! Transaction commands: listing, showing and transferring.

use crate::api::{self, fetch_all, Backend, Mode};
use crate::args::{TransactionArgs, TransactionsArgs, TransferArgs};
use crate::commands::{interruptible, Out};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::Transaction;
use crate::views::render::transaction_table;
use crate::views::TransactionsState;
use crate::{Config, Result};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info};

/// Lists transactions, newest first. With a jar, only transfers into or out of it. With a date
/// range, only those made from the start of `start` to the end of `end`.
pub async fn transactions(
    config: Config,
    mode: Mode,
    args: TransactionsArgs,
) -> Result<Out<Vec<Transaction>>> {
    let backend = api::backend(&config, mode)?;
    let backend = backend.as_ref();
    let (jars, transactions) = interruptible(async {
        tokio::try_join!(backend.list_jars(), select_transactions(backend, &args))
    })
    .await?;
    if transactions.is_empty() {
        return Ok(Out::new("There are no transactions", transactions));
    }
    Ok(Out::new(transaction_table(&transactions, &jars), transactions))
}

async fn select_transactions(
    backend: &dyn Backend,
    args: &TransactionsArgs,
) -> Result<Vec<Transaction>> {
    if let Some(jar) = args.jar() {
        return backend.transactions_for_jar(jar).await;
    }
    if let Some((start, end)) = args.range() {
        let (start, end) = day_bounds(start, end)?;
        debug!("Transactions from {start} to {end}");
        return backend.transactions_in_range(start, end).await;
    }
    backend.list_transactions().await
}

/// The first instant of `start` and the last millisecond of `end`, in UTC.
fn day_bounds(start: NaiveDate, end: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        .context("Unable to build the end of day")
        .pub_result(ErrorType::Internal)?;
    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(last).and_utc(),
    ))
}

/// Shows one transaction.
pub async fn transaction(
    config: Config,
    mode: Mode,
    args: TransactionArgs,
) -> Result<Out<Transaction>> {
    let backend = api::backend(&config, mode)?;
    let backend = backend.as_ref();
    let (jars, transaction) = interruptible(async {
        tokio::try_join!(backend.list_jars(), backend.get_transaction(args.id()))
    })
    .await?;
    Ok(Out::new(
        transaction_table(std::slice::from_ref(&transaction), &jars),
        transaction,
    ))
}

/// Moves money between two jars through the transactions screen's dialog. Without a description
/// the transfer is described as `Transfer from <source> to <destination>`.
pub async fn transfer(config: Config, mode: Mode, args: TransferArgs) -> Result<Out<Transaction>> {
    let backend = api::backend(&config, mode)?;
    let backend = backend.as_ref();
    let mut state = TransactionsState::default();

    // The jar names are needed for the default description.
    let ticket = state.begin_fetch();
    let result = interruptible(fetch_all(backend)).await;
    let failure = result.as_ref().err().map(Error::error_type);
    state.apply_fetch(ticket, result);
    if let (Some(error_type), Some(message)) = (failure, state.error()) {
        return Err(Error::msg(error_type, message.to_string()));
    }

    state.open_transfer_dialog();
    state.set_transfer_source(args.from());
    state.set_transfer_destination(args.to());
    state.set_transfer_amount(args.amount());
    state.set_transfer_description(args.description().unwrap_or_default());
    let Some(transaction) = interruptible(state.submit_transfer(backend)).await? else {
        return Ok("Nothing was submitted".into());
    };

    let message = format!(
        "Moved {} from {} to {}: {}",
        transaction.amount,
        name(transaction.source_name(state.jars()), &transaction, true),
        name(transaction.destination_name(state.jars()), &transaction, false),
        transaction.description
    );
    info!("{message}");
    Ok(Out::new(message, transaction))
}

fn name(found: Option<&str>, transaction: &Transaction, source: bool) -> String {
    match found {
        Some(name) => name.to_string(),
        None if source => format!("jar {}", transaction.source_jar_id),
        None => format!("jar {}", transaction.destination_jar_id),
    }
}
