//! The dashboard and the balance history dataset.

use crate::api::{self, fetch_all, Mode};
use crate::args::{ChartArgs, HistoryArgs};
use crate::commands::{interruptible, Out};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Amount, Jar, Transaction};
use crate::series::{DayRecord, HistorySource, RandomJitter, SeriesDescriptor, Slice};
use crate::views::render::{self, distribution_bars, jar_table, transaction_table, Rendered};
use crate::views::{render::OutputFormat, DashboardState};
use crate::{Config, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Everything the dashboard shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_balance: Amount,
    pub jars: Vec<Jar>,
    pub distribution: Vec<Slice>,
    pub series: Vec<SeriesDescriptor>,
    pub history: Vec<DayRecord>,
    pub recent_transactions: Vec<Transaction>,
}

/// Loads the dashboard and renders it as markdown: the total, the jar cards, the distribution,
/// the balance history ending on `today` and the most recent transactions.
pub async fn dashboard(
    config: Config,
    mode: Mode,
    chart: ChartArgs,
    today: NaiveDate,
) -> Result<Out<Dashboard>> {
    let state = load(&config, mode, &chart).await?;
    let mut source = history_source(chart.seed());
    let history = state.history(today, source.as_mut());
    let series = state.series();
    let chart_text = render::history(
        &history,
        &series,
        state.view_mode(),
        state.chart_kind(),
        OutputFormat::Table,
    )
    .pub_result(ErrorType::Internal)?;

    let dashboard = Dashboard {
        total_balance: state.total_balance(),
        jars: state.jars().to_vec(),
        distribution: state.distribution(),
        series,
        history,
        recent_transactions: state.recent_transactions().to_vec(),
    };

    let mut message = format!("Total balance: {}\n\n", dashboard.total_balance);
    message.push_str(&format!("## Jars\n\n{}\n", jar_table(&dashboard.jars)));
    message.push_str(&format!(
        "## Money distribution\n\n{}\n",
        distribution_bars(&dashboard.distribution)
    ));
    message.push_str(&format!(
        "## Balance history, {}, {}\n\n{}\n",
        state.time_range(),
        state.view_mode().axis_label(),
        chart_text
    ));
    message.push_str("## Recent transactions\n\n");
    if dashboard.recent_transactions.is_empty() {
        message.push_str("There are no transactions\n");
    } else {
        message.push_str(&transaction_table(
            &dashboard.recent_transactions,
            &dashboard.jars,
        ));
    }
    Ok(Out::new(message, dashboard))
}

/// Derives the balance history for the chosen jars and renders it as a table, bars, JSON or CSV.
pub async fn history(
    config: Config,
    mode: Mode,
    args: HistoryArgs,
    today: NaiveDate,
) -> Result<Out<Rendered>> {
    let chart = args.chart();
    let state = load(&config, mode, chart).await?;
    let mut source = history_source(chart.seed());
    let records = state.history(today, source.as_mut());
    debug!(
        "Derived {} days of history for {} jars",
        records.len(),
        state.selected_jars().len()
    );
    let rendered = render::history(
        &records,
        &state.series(),
        state.view_mode(),
        state.chart_kind(),
        args.format(),
    )
    .pub_result(ErrorType::Internal)?;
    Ok(Out::new(rendered.to_string(), rendered))
}

/// Fetches the jars and transactions into a dashboard and applies the chart options.
async fn load(config: &Config, mode: Mode, chart: &ChartArgs) -> Result<DashboardState> {
    let backend = api::backend(config, mode)?;
    let time_range = chart.days().unwrap_or_else(|| config.default_time_range());
    let mut state = DashboardState::new(config.recent_transactions(), config.palette(), time_range);

    let ticket = state.begin_fetch();
    let result = interruptible(fetch_all(backend.as_ref())).await;
    let failure = result.as_ref().err().map(Error::error_type);
    state.apply_fetch(ticket, result);
    if let (Some(error_type), Some(message)) = (failure, state.error()) {
        return Err(Error::msg(error_type, message.to_string()));
    }

    if let Some(jars) = chart.jars() {
        state.set_selected_jars(jars.iter().copied());
    }
    state.set_view_mode(chart.mode());
    state.set_chart_kind(chart.chart());
    Ok(state)
}

fn history_source(seed: Option<u64>) -> Box<dyn HistorySource + Send> {
    match seed {
        Some(seed) => Box::new(RandomJitter::seeded(seed)),
        None => Box::new(RandomJitter::from_entropy()),
    }
}
