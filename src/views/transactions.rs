use crate::api::{fetch_all, Backend};
use crate::model::{Jar, JarId, Transaction};
use crate::views::{FetchGuard, Ticket, TransferForm, FETCH_FAILED, TRANSFER_FAILED};
use crate::Result;
use serde::Serialize;
use tracing::{debug, error};

/// The transactions screen: every transaction, and a dialog to create a transfer with a
/// description of the user's choosing.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionsState {
    transactions: Vec<Transaction>,
    jars: Vec<Jar>,
    loading: bool,
    error: Option<String>,
    dialog: Option<TransferForm>,
    #[serde(skip)]
    guard: FetchGuard,
}

impl Default for TransactionsState {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            jars: Vec::new(),
            loading: true,
            error: None,
            dialog: None,
            guard: FetchGuard::default(),
        }
    }
}

impl TransactionsState {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn jars(&self) -> &[Jar] {
        &self.jars
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dialog(&self) -> Option<&TransferForm> {
        self.dialog.as_ref()
    }

    pub fn begin_fetch(&mut self) -> Ticket {
        self.loading = true;
        self.guard.begin()
    }

    /// See `DashboardState::apply_fetch`.
    pub fn apply_fetch(
        &mut self,
        ticket: Ticket,
        result: Result<(Vec<Jar>, Vec<Transaction>)>,
    ) -> bool {
        if !self.guard.accepts(ticket) {
            debug!("Discarding a stale transactions fetch");
            return false;
        }
        self.loading = false;
        match result {
            Ok((jars, transactions)) => {
                self.jars = jars;
                self.transactions = transactions;
                self.error = None;
            }
            Err(e) => {
                error!("{FETCH_FAILED}: {e}");
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
        true
    }

    pub async fn refresh(&mut self, backend: &dyn Backend) {
        let ticket = self.begin_fetch();
        let result = fetch_all(backend).await;
        self.apply_fetch(ticket, result);
    }

    pub fn unmount(&mut self) {
        self.guard.unmount();
    }

    /// Opens the new transaction dialog with every field empty.
    pub fn open_transfer_dialog(&mut self) {
        self.dialog = Some(TransferForm::default());
    }

    pub fn set_transfer_source(&mut self, id: JarId) {
        if let Some(form) = self.dialog.as_mut() {
            form.source = Some(id);
        }
    }

    pub fn set_transfer_destination(&mut self, id: JarId) {
        if let Some(form) = self.dialog.as_mut() {
            form.destination = Some(id);
        }
    }

    pub fn set_transfer_amount(&mut self, amount: impl Into<String>) {
        if let Some(form) = self.dialog.as_mut() {
            form.amount = amount.into();
        }
    }

    pub fn set_transfer_description(&mut self, description: impl Into<String>) {
        if let Some(form) = self.dialog.as_mut() {
            form.description = description.into();
        }
    }

    /// Closes the dialog and forgets what was typed.
    pub fn close_transfer_dialog(&mut self) {
        self.dialog = None;
    }

    /// Submits the dialog. An empty description is replaced with the generated one. On success
    /// the data is fetched again and the dialog closes. On failure the dialog stays open and the
    /// error message is set.
    pub async fn submit_transfer(
        &mut self,
        backend: &dyn Backend,
    ) -> Result<Option<Transaction>> {
        let Some(form) = self.dialog.clone() else {
            return Ok(None);
        };
        match form.submit(backend, &self.jars).await {
            Ok(None) => Ok(None),
            Ok(Some(transaction)) => {
                self.refresh(backend).await;
                self.close_transfer_dialog();
                Ok(Some(transaction))
            }
            Err(e) => {
                error!("{TRANSFER_FAILED}: {e}");
                self.error = Some(TRANSFER_FAILED.to_string());
                Err(e)
            }
        }
    }
}
