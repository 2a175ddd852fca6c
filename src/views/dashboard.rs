use crate::api::{fetch_all, Backend};
use crate::model::{Direction, Jar, JarId, Transaction};
use crate::series::{
    assemble_series, derive_series, distribution, total_balance, ChartKind, DayRecord,
    HistorySource, Palette, SeriesDescriptor, Slice, TimeRange, ViewMode,
};
use crate::views::{BalanceForm, FetchGuard, Ticket, TransferForm, FETCH_FAILED, TRANSFER_FAILED};
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, error};

const RECENT_TRANSACTIONS: usize = 5;

/// The dashboard: jar cards, totals, the distribution chart, the history chart, and the most
/// recent transactions.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    jars: Vec<Jar>,
    recent_transactions: Vec<Transaction>,
    loading: bool,
    error: Option<String>,
    time_range: TimeRange,
    selected_jars: BTreeSet<JarId>,
    chart_kind: ChartKind,
    view_mode: ViewMode,
    balance_dialog: Option<BalanceForm>,
    transfer_dialog: Option<TransferForm>,
    #[serde(skip)]
    recent_limit: usize,
    #[serde(skip)]
    palette: Palette,
    #[serde(skip)]
    guard: FetchGuard,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            jars: Vec::new(),
            recent_transactions: Vec::new(),
            loading: true,
            error: None,
            time_range: TimeRange::default(),
            selected_jars: BTreeSet::new(),
            chart_kind: ChartKind::default(),
            view_mode: ViewMode::default(),
            balance_dialog: None,
            transfer_dialog: None,
            recent_limit: RECENT_TRANSACTIONS,
            palette: Palette::default(),
            guard: FetchGuard::default(),
        }
    }
}

impl DashboardState {
    /// A dashboard showing `recent_limit` recent transactions and coloring series with `palette`.
    pub fn new(recent_limit: usize, palette: Palette, time_range: TimeRange) -> Self {
        Self {
            recent_limit,
            palette,
            time_range,
            ..Self::default()
        }
    }

    pub fn jars(&self) -> &[Jar] {
        &self.jars
    }

    pub fn recent_transactions(&self) -> &[Transaction] {
        &self.recent_transactions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The message of the last failure, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn selected_jars(&self) -> &BTreeSet<JarId> {
        &self.selected_jars
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.chart_kind
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn balance_dialog(&self) -> Option<&BalanceForm> {
        self.balance_dialog.as_ref()
    }

    pub fn transfer_dialog(&self) -> Option<&TransferForm> {
        self.transfer_dialog.as_ref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    // Fetching

    /// Starts a fetch. The returned ticket must be handed to `apply_fetch` with the result.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.loading = true;
        self.guard.begin()
    }

    /// Applies the result of a fetch unless a newer fetch has started or the screen is gone.
    /// Returns whether the result was applied.
    pub fn apply_fetch(
        &mut self,
        ticket: Ticket,
        result: Result<(Vec<Jar>, Vec<Transaction>)>,
    ) -> bool {
        if !self.guard.accepts(ticket) {
            debug!("Discarding a stale dashboard fetch");
            return false;
        }
        self.loading = false;
        match result {
            Ok((jars, transactions)) => {
                self.selected_jars = jars.iter().map(|jar| jar.id).collect();
                self.jars = jars;
                self.recent_transactions =
                    transactions.into_iter().take(self.recent_limit).collect();
                self.error = None;
            }
            Err(e) => {
                error!("{FETCH_FAILED}: {e}");
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
        true
    }

    /// Fetches jars and transactions and applies them.
    pub async fn refresh(&mut self, backend: &dyn Backend) {
        let ticket = self.begin_fetch();
        let result = fetch_all(backend).await;
        self.apply_fetch(ticket, result);
    }

    /// The screen is going away. Fetches still in flight will not change it.
    pub fn unmount(&mut self) {
        self.guard.unmount();
    }

    // Chart controls

    /// Sets the number of days of history. Zero or an out-of-range value is ignored.
    pub fn set_time_range_days(&mut self, days: u32) {
        match TimeRange::new(days) {
            Some(range) => self.time_range = range,
            None => debug!("Ignoring time range of {days} days"),
        }
    }

    /// Selects the jars plotted in the history chart. Ids of unknown jars are dropped.
    pub fn set_selected_jars(&mut self, ids: impl IntoIterator<Item = JarId>) {
        let known: BTreeSet<JarId> = self.jars.iter().map(|jar| jar.id).collect();
        self.selected_jars = ids.into_iter().filter(|id| known.contains(id)).collect();
    }

    /// Adds the jar to the history chart, or removes it if it is already there.
    pub fn toggle_jar(&mut self, id: JarId) {
        if !self.selected_jars.remove(&id) && self.jars.iter().any(|jar| jar.id == id) {
            self.selected_jars.insert(id);
        }
    }

    pub fn set_chart_kind(&mut self, kind: ChartKind) {
        self.chart_kind = kind;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    // Derived chart data

    /// The history dataset for the current range and selection.
    pub fn history<H>(&self, today: NaiveDate, history: &mut H) -> Vec<DayRecord>
    where
        H: HistorySource + ?Sized,
    {
        derive_series(
            &self.jars,
            &self.selected_jars,
            self.time_range,
            today,
            history,
        )
    }

    /// One series per selected jar for the current view mode.
    pub fn series(&self) -> Vec<SeriesDescriptor> {
        assemble_series(
            &self.jars,
            &self.selected_jars,
            self.view_mode,
            &self.palette,
        )
    }

    pub fn distribution(&self) -> Vec<Slice> {
        distribution(&self.jars, &self.palette)
    }

    pub fn total_balance(&self) -> crate::model::Amount {
        total_balance(&self.jars)
    }

    // Balance dialog

    /// Opens the add or remove money dialog for a jar with an empty amount.
    pub fn open_balance_dialog(&mut self, jar_id: JarId, direction: Direction) {
        self.balance_dialog = Some(BalanceForm::new(jar_id, direction));
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        if let Some(form) = self.balance_dialog.as_mut() {
            form.amount = amount.into();
        }
    }

    pub fn close_balance_dialog(&mut self) {
        self.balance_dialog = None;
    }

    /// Submits the balance dialog. On success the data is fetched again and the dialog closes. On
    /// failure the dialog stays open and the error message is set. Does nothing without an open
    /// dialog.
    pub async fn submit_balance(&mut self, backend: &dyn Backend) -> Result<Option<Jar>> {
        let Some(form) = self.balance_dialog.clone() else {
            return Ok(None);
        };
        match form.submit(backend).await {
            Ok(jar) => {
                self.refresh(backend).await;
                self.close_balance_dialog();
                Ok(Some(jar))
            }
            Err(e) => {
                let message = form.failure_message();
                error!("{message}: {e}");
                self.error = Some(message);
                Err(e)
            }
        }
    }

    // Transfer dialog

    /// Opens the transfer dialog with nothing chosen.
    pub fn open_transfer_dialog(&mut self) {
        self.transfer_dialog = Some(TransferForm::default());
    }

    pub fn set_transfer_source(&mut self, id: JarId) {
        if let Some(form) = self.transfer_dialog.as_mut() {
            form.source = Some(id);
        }
    }

    pub fn set_transfer_destination(&mut self, id: JarId) {
        if let Some(form) = self.transfer_dialog.as_mut() {
            form.destination = Some(id);
        }
    }

    pub fn set_transfer_amount(&mut self, amount: impl Into<String>) {
        if let Some(form) = self.transfer_dialog.as_mut() {
            form.amount = amount.into();
        }
    }

    pub fn close_transfer_dialog(&mut self) {
        self.transfer_dialog = None;
    }

    /// Submits the transfer dialog with the description `Transfer from <source> to <destination>`.
    /// Does nothing while the dialog is closed or incomplete. Success and failure are handled as
    /// in `submit_balance`.
    pub async fn submit_transfer(
        &mut self,
        backend: &dyn Backend,
    ) -> Result<Option<Transaction>> {
        let Some(mut form) = self.transfer_dialog.clone() else {
            return Ok(None);
        };
        form.description.clear();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestState;
    use crate::error::{Error, ErrorType};
    use crate::model::{Amount, TransactionId};
    use crate::series::FlatHistory;
    use crate::test::TestEnv;

    async fn loaded() -> (TestEnv, DashboardState) {
        let env = TestEnv::new().await;
        let mut state = DashboardState::default();
        state.refresh(&env.backend()).await;
        (env, state)
    }

    #[tokio::test]
    async fn test_refresh_loads_and_selects_all() {
        let (_env, state) = loaded().await;
        assert!(!state.is_loading());
        assert!(state.error().is_none());
        assert_eq!(state.jars().len(), 6);
        assert_eq!(state.selected_jars().len(), 6);
        assert_eq!(state.recent_transactions().len(), 5);
        assert_eq!(state.recent_transactions()[0].id, TransactionId(6));
        assert_eq!(state.total_balance(), Amount::from(3000));
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let (_env, mut state) = loaded().await;
        let stale = state.begin_fetch();
        let current = state.begin_fetch();
        assert!(!state.apply_fetch(stale, Ok((vec![], vec![]))));
        assert_eq!(state.jars().len(), 6);
        assert!(state.apply_fetch(current, Ok((vec![Jar::new(1, "Only", 1)], vec![]))));
        assert_eq!(state.jars().len(), 1);
    }

    #[tokio::test]
    async fn test_unmounted_ignores_results() {
        let mut state = DashboardState::default();
        let ticket = state.begin_fetch();
        state.unmount();
        assert!(!state.apply_fetch(ticket, Ok((vec![Jar::new(1, "Rent", 1)], vec![]))));
        assert!(state.jars().is_empty());
    }

    #[test]
    fn test_failed_fetch_sets_message() {
        let mut state = DashboardState::default();
        let ticket = state.begin_fetch();
        let failure = Err(Error::msg(ErrorType::Network, "connection refused"));
        assert!(state.apply_fetch(ticket, failure));
        assert_eq!(state.error(), Some("Failed to fetch data"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_chart_controls() {
        let (_env, mut state) = loaded().await;
        state.set_time_range_days(30);
        assert_eq!(state.time_range(), TimeRange::MONTH);
        state.set_time_range_days(0);
        assert_eq!(state.time_range(), TimeRange::MONTH);

        state.set_selected_jars([JarId(1), JarId(3), JarId(99)]);
        assert_eq!(state.selected_jars().len(), 2);
        state.toggle_jar(JarId(3));
        assert!(!state.selected_jars().contains(&JarId(3)));
        state.toggle_jar(JarId(3));
        assert!(state.selected_jars().contains(&JarId(3)));
        state.toggle_jar(JarId(99));
        assert!(!state.selected_jars().contains(&JarId(99)));

        state.set_view_mode(ViewMode::Percentage);
        state.set_chart_kind(ChartKind::Bar);
        let series = state.series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].data_key, "Necessities %");

        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let records = state.history(today, &mut FlatHistory);
        assert_eq!(records.len(), 30);
        assert_eq!(records[29].values.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_balance_refreshes_and_closes() {
        let (env, mut state) = loaded().await;
        state.open_balance_dialog(JarId(2), Direction::Add);
        state.set_amount("100");
        let jar = state.submit_balance(&env.backend()).await.unwrap().unwrap();
        assert_eq!(jar.current_balance, Amount::from(400));
        assert!(state.balance_dialog().is_none());
        assert_eq!(state.jars()[1].current_balance, Amount::from(400));
    }

    #[tokio::test]
    async fn test_submit_balance_failure_keeps_dialog() {
        let (env, mut state) = loaded().await;
        state.open_balance_dialog(JarId(6), Direction::Remove);
        state.set_amount("10000");
        let e = state.submit_balance(&env.backend()).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::InsufficientFunds);
        assert_eq!(state.error(), Some("Failed to remove money"));
        assert!(state.balance_dialog().is_some());
        assert_eq!(env.get_state(), TestState::default());
    }

    #[tokio::test]
    async fn test_submit_without_dialog_does_nothing() {
        let (env, mut state) = loaded().await;
        assert!(state.submit_balance(&env.backend()).await.unwrap().is_none());
        assert!(state.submit_transfer(&env.backend()).await.unwrap().is_none());
        state.set_amount("5");
        state.set_transfer_amount("5");
        assert!(state.balance_dialog().is_none());
    }

    #[tokio::test]
    async fn test_submit_transfer() {
        let (env, mut state) = loaded().await;
        state.open_transfer_dialog();
        state.set_transfer_source(JarId(1));
        assert!(state.submit_transfer(&env.backend()).await.unwrap().is_none());
        state.set_transfer_destination(JarId(5));
        state.set_transfer_amount("50");
        let t = state.submit_transfer(&env.backend()).await.unwrap().unwrap();
        assert_eq!(t.description, "Transfer from Necessities to Play");
        assert!(state.transfer_dialog().is_none());
        assert_eq!(state.recent_transactions()[0].id, t.id);
        assert_eq!(state.jars()[0].current_balance, Amount::from(1600));
    }

    #[tokio::test]
    async fn test_submit_transfer_failure() {
        let (env, mut state) = loaded().await;
        state.open_transfer_dialog();
        state.set_transfer_source(JarId(2));
        state.set_transfer_destination(JarId(2));
        state.set_transfer_amount("1");
        let e = state.submit_transfer(&env.backend()).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert_eq!(state.error(), Some("Failed to create transaction"));
        assert!(state.transfer_dialog().is_some());
        state.close_transfer_dialog();
        assert!(state.transfer_dialog().is_none());
    }
}
