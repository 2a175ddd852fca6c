//! Implements the `Backend` trait in memory.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the
//! whole app, top-to-bottom, without a budgeting server. State lives in a process-wide registry
//! keyed by the configured base URL, so every `TestBackend` created for the same URL sees the same
//! jars and transactions.

use crate::api::Backend;
use crate::error::{Error, ErrorType};
use crate::model::{
    default_transfer_description, format_timestamp, Amount, Direction, Jar, JarId, Transaction,
    TransactionId, TransferRequest,
};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::trace;

static STATES: LazyLock<Mutex<HashMap<String, TestState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The resources held by a `TestBackend`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestState {
    pub(crate) jars: Vec<Jar>,
    /// Newest first, the order in which the API lists them.
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) next_transaction_id: i64,
}

/// An in-memory `Backend` that enforces the same rules as the API: unknown ids are `NotFound`,
/// non-positive amounts and transfers to the same jar are `Validation` errors, and nothing may
/// take a balance below zero.
#[derive(Debug, Clone)]
pub(crate) struct TestBackend {
    key: String,
}

impl TestBackend {
    /// Opens the state registered under `key`, seeding it on first use.
    pub(crate) fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        lock().entry(key.clone()).or_default();
        Self { key }
    }

    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestState {
        lock().get(&self.key).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, state: TestState) {
        lock().insert(self.key.clone(), state);
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TestState) -> Result<T>) -> Result<T> {
        let mut states = lock();
        let state = states.entry(self.key.clone()).or_default();
        f(state)
    }
}

fn lock() -> std::sync::MutexGuard<'static, HashMap<String, TestState>> {
    STATES.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn list_jars(&self) -> Result<Vec<Jar>> {
        trace!("list_jars from {}", self.key);
        self.with_state(|state| Ok(state.jars.clone()))
    }

    async fn get_jar(&self, id: JarId) -> Result<Jar> {
        self.with_state(|state| state.jar(id).cloned())
    }

    async fn get_balance(&self, id: JarId) -> Result<Amount> {
        self.with_state(|state| state.jar(id).map(|jar| jar.current_balance))
    }

    async fn adjust_balance(
        &self,
        id: JarId,
        amount: Amount,
        direction: Direction,
    ) -> Result<Jar> {
        trace!("adjust_balance {direction} {amount} for jar {id}");
        self.with_state(|state| {
            require_positive(amount)?;
            let now = format_timestamp(Utc::now());
            let jar = state.jar_mut(id)?;
            let balance = match direction {
                Direction::Add => jar.current_balance + amount,
                Direction::Remove => jar.current_balance - amount,
            };
            if balance.is_negative() {
                return Err(insufficient(jar));
            }
            jar.current_balance = balance;
            jar.updated_at = Some(now);
            Ok(jar.clone())
        })
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.with_state(|state| Ok(state.transactions.clone()))
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.with_state(|state| {
            state
                .transactions
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| {
                    Error::msg(ErrorType::NotFound, format!("Transaction {id} not found"))
                })
        })
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<Transaction> {
        self.with_state(|state| {
            let request = TransferRequest::new(
                transaction.source_jar_id,
                transaction.destination_jar_id,
                transaction.amount,
                transaction.description.clone(),
            );
            let date = (!transaction.transaction_date.is_empty())
                .then(|| transaction.transaction_date.clone());
            state.record_transfer(&request, date)
        })
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<Transaction> {
        trace!(
            "transfer {} from {} to {}",
            request.amount,
            request.source_jar_id,
            request.destination_jar_id
        );
        self.with_state(|state| state.record_transfer(request, None))
    }

    async fn transactions_for_jar(&self, id: JarId) -> Result<Vec<Transaction>> {
        self.with_state(|state| {
            state.jar(id)?;
            Ok(state
                .transactions
                .iter()
                .filter(|t| t.source_jar_id == id || t.destination_jar_id == id)
                .cloned()
                .collect())
        })
    }

    async fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        if start > end {
            return Err(Error::msg(
                ErrorType::Validation,
                "The start date must not be after the end date",
            ));
        }
        self.with_state(|state| {
            Ok(state
                .transactions
                .iter()
                .filter(|t| {
                    t.timestamp()
                        .map(|ts| ts >= start && ts <= end)
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        })
    }
}

impl TestState {
    fn jar(&self, id: JarId) -> Result<&Jar> {
        self.jars
            .iter()
            .find(|jar| jar.id == id)
            .ok_or_else(|| jar_not_found(id))
    }

    fn jar_mut(&mut self, id: JarId) -> Result<&mut Jar> {
        self.jars
            .iter_mut()
            .find(|jar| jar.id == id)
            .ok_or_else(|| jar_not_found(id))
    }

    /// Moves the money and records the transaction. Nothing changes if any rule is broken.
    fn record_transfer(
        &mut self,
        request: &TransferRequest,
        transaction_date: Option<String>,
    ) -> Result<Transaction> {
        require_positive(request.amount)?;
        if request.source_jar_id == request.destination_jar_id {
            return Err(Error::msg(
                ErrorType::Validation,
                "Source and destination jars must be different",
            ));
        }
        let source = self.jar(request.source_jar_id)?;
        self.jar(request.destination_jar_id)?;
        if (source.current_balance - request.amount).is_negative() {
            return Err(insufficient(source));
        }

        let now = format_timestamp(Utc::now());
        let source = self.jar_mut(request.source_jar_id)?;
        source.current_balance = source.current_balance - request.amount;
        source.updated_at = Some(now.clone());
        let source = source.clone();
        let destination = self.jar_mut(request.destination_jar_id)?;
        destination.current_balance = destination.current_balance + request.amount;
        destination.updated_at = Some(now.clone());
        let destination = destination.clone();

        let id = TransactionId(self.next_transaction_id);
        self.next_transaction_id += 1;
        let transaction = Transaction {
            id,
            source_jar_id: source.id,
            destination_jar_id: destination.id,
            amount: request.amount,
            description: request.description.clone(),
            transaction_date: transaction_date.unwrap_or_else(|| now.clone()),
            created_at: now,
            updated_at: None,
            source_jar: Some(source),
            destination_jar: Some(destination),
        };
        self.transactions.insert(0, transaction.clone());
        Ok(transaction)
    }
}

fn require_positive(amount: Amount) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(Error::msg(
            ErrorType::Validation,
            format!("The amount must be greater than zero, got {amount}"),
        ))
    }
}

fn jar_not_found(id: JarId) -> Error {
    Error::msg(ErrorType::NotFound, format!("Jar {id} not found"))
}

fn insufficient(jar: &Jar) -> Error {
    Error::msg(
        ErrorType::InsufficientFunds,
        format!(
            "Insufficient funds in jar '{}', the balance is {}",
            jar.name, jar.current_balance
        ),
    )
}

impl Default for TestState {
    /// The six jars of the classic jar system with a few transfers between them.
    fn default() -> Self {
        let created = "2025-01-01T09:00:00";
        let jars: Vec<Jar> = SEED_JARS
            .iter()
            .map(|(id, name, percentage, description, balance)| Jar {
                id: JarId(*id),
                name: name.to_string(),
                percentage: *percentage,
                description: description.to_string(),
                current_balance: Amount::from(*balance),
                created_at: created.to_string(),
                updated_at: None,
            })
            .collect();

        let transactions: Vec<Transaction> = SEED_TRANSFERS
            .iter()
            .rev()
            .enumerate()
            .map(|(ix, (source, destination, amount, date))| {
                let name = |id: i64| {
                    jars.iter()
                        .find(|j| j.id == JarId(id))
                        .map(|j| j.name.clone())
                        .unwrap_or_default()
                };
                Transaction {
                    id: TransactionId(SEED_TRANSFERS.len() as i64 - ix as i64),
                    source_jar_id: JarId(*source),
                    destination_jar_id: JarId(*destination),
                    amount: Amount::from(*amount),
                    description: default_transfer_description(&name(*source), &name(*destination)),
                    transaction_date: date.to_string(),
                    created_at: date.to_string(),
                    updated_at: None,
                    source_jar: None,
                    destination_jar: None,
                }
            })
            .collect();

        Self {
            jars,
            next_transaction_id: SEED_TRANSFERS.len() as i64 + 1,
            transactions,
        }
    }
}

/// (id, name, percentage, description, balance)
const SEED_JARS: [(i64, &str, f64, &str, i64); 6] = [
    (1, "Necessities", 55.0, "Rent, groceries and bills", 1650),
    (2, "Financial Freedom", 10.0, "Investments that pay you", 300),
    (3, "Long-term Savings", 10.0, "Big purchases and emergencies", 300),
    (4, "Education", 10.0, "Books and courses", 300),
    (5, "Play", 10.0, "Spend it on fun", 300),
    (6, "Give", 5.0, "Gifts and donations", 150),
];

/// (source, destination, amount, date), oldest first.
const SEED_TRANSFERS: [(i64, i64, i64, &str); 6] = [
    (1, 3, 100, "2025-01-03T10:15:00"),
    (1, 2, 50, "2025-01-05T08:30:00"),
    (5, 6, 20, "2025-01-08T19:45:00"),
    (3, 4, 40, "2025-01-12T12:00:00"),
    (1, 5, 75, "2025-01-15T17:20:00"),
    (2, 3, 25, "2025-01-20T09:05:00"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn backend(name: &str) -> TestBackend {
        let backend = TestBackend::new(format!("http://{name}.test/api/"));
        backend.set_state(TestState::default());
        backend
    }

    #[test]
    fn test_seed_state() {
        let state = TestState::default();
        assert_eq!(state.jars.len(), 6);
        assert_eq!(state.transactions.len(), 6);
        assert_eq!(state.transactions[0].id, TransactionId(6));
        assert_eq!(state.transactions[5].id, TransactionId(1));
        assert_eq!(
            state.transactions[5].description,
            "Transfer from Necessities to Long-term Savings"
        );
        assert_eq!(state.next_transaction_id, 7);
    }

    #[tokio::test]
    async fn test_transfer_moves_money() {
        let backend = backend("transfer-moves-money");
        let request = TransferRequest::new(1, 2, 50, "x");
        let t = backend.transfer(&request).await.unwrap();
        assert_eq!(t.amount, Amount::from(50));
        assert_eq!(t.source_jar_id, JarId(1));
        assert_eq!(t.destination_jar_id, JarId(2));
        assert_eq!(t.description, "x");
        assert_eq!(t.id, TransactionId(7));

        assert_eq!(backend.get_balance(JarId(1)).await.unwrap(), Amount::from(1600));
        assert_eq!(backend.get_balance(JarId(2)).await.unwrap(), Amount::from(350));
        let listed = backend.list_transactions().await.unwrap();
        assert_eq!(listed[0].id, t.id);
        assert_eq!(backend.get_transaction(t.id).await.unwrap(), t);
    }

    #[tokio::test]
    async fn test_transfer_rules() {
        let backend = backend("transfer-rules");
        let before = backend.get_state();

        let same = TransferRequest::new(1, 1, 10, "");
        let e = backend.transfer(&same).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let zero = TransferRequest::new(1, 2, 0, "");
        let e = backend.transfer(&zero).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let unknown = TransferRequest::new(1, 99, 10, "");
        let e = backend.transfer(&unknown).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);

        let too_much = TransferRequest::new(6, 1, 151, "");
        let e = backend.transfer(&too_much).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::InsufficientFunds);
        assert!(e.to_string().contains("Insufficient funds"));

        assert_eq!(before, backend.get_state());
    }

    #[tokio::test]
    async fn test_adjust_balance() {
        let backend = backend("adjust-balance");
        let jar = backend
            .adjust_balance(JarId(6), Amount::from(25), Direction::Add)
            .await
            .unwrap();
        assert_eq!(jar.current_balance, Amount::from(175));
        assert!(jar.updated_at.is_some());

        let jar = backend
            .adjust_balance(JarId(6), Amount::from(175), Direction::Remove)
            .await
            .unwrap();
        assert!(jar.current_balance.is_zero());

        let e = backend
            .adjust_balance(JarId(6), Amount::from(1), Direction::Remove)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::InsufficientFunds);

        let e = backend
            .adjust_balance(JarId(42), Amount::from(1), Direction::Add)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);

        let e = backend
            .adjust_balance(JarId(1), Amount::from(-5), Direction::Add)
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_create_transaction_keeps_date() {
        let backend = backend("create-transaction");
        let mut t = Transaction {
            id: TransactionId::default(),
            source_jar_id: JarId(1),
            destination_jar_id: JarId(4),
            amount: Amount::from(10),
            description: "Course".into(),
            transaction_date: "2025-02-01T08:00:00".into(),
            created_at: String::new(),
            updated_at: None,
            source_jar: None,
            destination_jar: None,
        };
        let created = backend.create_transaction(&t).await.unwrap();
        assert_eq!(created.transaction_date, "2025-02-01T08:00:00");
        assert_eq!(created.id, TransactionId(7));

        t.transaction_date.clear();
        let created = backend.create_transaction(&t).await.unwrap();
        assert!(created.timestamp().is_some());
    }

    #[tokio::test]
    async fn test_queries() {
        let backend = backend("queries");
        let for_play = backend.transactions_for_jar(JarId(5)).await.unwrap();
        assert_eq!(for_play.len(), 2);
        let e = backend.transactions_for_jar(JarId(50)).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);

        let start = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 12, 23, 59, 59).unwrap();
        let in_range = backend.transactions_in_range(start, end).await.unwrap();
        let ids: Vec<i64> = in_range.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![4, 3, 2]);

        let e = backend.transactions_in_range(end, start).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);

        let e = backend.get_transaction(TransactionId(100)).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_backends_with_same_key_share_state() {
        let a = backend("shared");
        let b = TestBackend::new("http://shared.test/api/");
        a.adjust_balance(JarId(1), Amount::from(1), Direction::Add)
            .await
            .unwrap();
        assert_eq!(b.get_balance(JarId(1)).await.unwrap(), Amount::from(1651));
    }
}
