//! The jarview MCP tools.

use crate::args::{AdjustArgs, ChartArgs, HistoryArgs, TransactionsArgs, TransferArgs};
use crate::commands;
use crate::error::{Error, ErrorType};
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::JarviewServer;
use crate::model::{parse_date, Direction, JarId};
use crate::series::{ChartKind, TimeRange, ViewMode};
use crate::views::render::OutputFormat;
use crate::Result;
use chrono::{Local, NaiveDate};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Parameters for the adjust_balance tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "AdjustBalanceParams")]
pub struct AdjustBalanceParams {
    /// The ID of the jar.
    pub jar_id: JarId,

    /// The amount of money, e.g. "25", "25.50" or "$1,200". Must be positive.
    pub amount: String,

    /// 'add' to put money into the jar, 'remove' to take money out.
    pub direction: Direction,
}

/// Parameters for the list_transactions tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[schemars(title = "ListTransactionsParams")]
pub struct ListTransactionsParams {
    /// Only list transfers into or out of this jar. Cannot be combined with dates.
    #[serde(default)]
    pub jar_id: Option<JarId>,

    /// The first day of a date range, e.g. "2025-01-01". Requires end_date.
    #[serde(default)]
    pub start_date: Option<String>,

    /// The last day of a date range, included. Requires start_date.
    #[serde(default)]
    pub end_date: Option<String>,
}

impl ListTransactionsParams {
    fn into_args(self) -> Result<TransactionsArgs> {
        let date = |s: Option<String>| -> Result<Option<NaiveDate>> {
            s.map(|s| {
                parse_date(&s).ok_or_else(|| {
                    Error::msg(ErrorType::Request, format!("Invalid date '{s}'"))
                })
            })
            .transpose()
        };
        let start = date(self.start_date)?;
        let end = date(self.end_date)?;
        if start.is_some() != end.is_some() {
            return Err(Error::msg(
                ErrorType::Request,
                "Both start_date and end_date are needed for a date range",
            ));
        }
        if self.jar_id.is_some() && start.is_some() {
            return Err(Error::msg(
                ErrorType::Request,
                "A jar and a date range cannot be combined",
            ));
        }
        Ok(TransactionsArgs::new(self.jar_id, start, end))
    }
}

/// Parameters for the transfer tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "TransferParams")]
pub struct TransferParams {
    /// The jar the money comes out of.
    pub source_jar_id: JarId,

    /// The jar the money goes into. Must differ from the source.
    pub destination_jar_id: JarId,

    /// The amount of money, e.g. "25" or "25.50". Must be positive.
    pub amount: String,

    /// Defaults to "Transfer from <source name> to <destination name>".
    #[serde(default)]
    pub description: Option<String>,
}

/// Parameters for the balance_history tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[schemars(title = "BalanceHistoryParams")]
pub struct BalanceHistoryParams {
    /// How many days of history, counting back from and including today. Defaults to the
    /// configured value, normally 7.
    #[serde(default)]
    pub days: Option<u32>,

    /// The jars to include. Defaults to every jar when omitted, an empty list selects none.
    /// Unknown IDs are ignored.
    #[serde(default)]
    pub jar_ids: Option<Vec<JarId>>,

    /// 'absolute' for dollar balances or 'percentage' for each jar's share of the day's total.
    #[serde(default)]
    pub mode: ViewMode,

    /// 'line' renders a table with one column per jar, 'bar' renders text bars per day. Only
    /// affects the 'table' format.
    #[serde(default)]
    pub chart: ChartKind,

    /// 'table', 'json' or 'csv'.
    #[serde(default)]
    pub format: OutputFormat,

    /// Seed for the simulated history so that repeated calls give the same values.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl BalanceHistoryParams {
    fn into_args(self) -> Result<HistoryArgs> {
        let days = self
            .days
            .map(|days| {
                TimeRange::new(days).ok_or_else(|| {
                    Error::msg(
                        ErrorType::Request,
                        format!(
                            "days must be between 1 and {}, got {days}",
                            TimeRange::MAX_DAYS
                        ),
                    )
                })
            })
            .transpose()?;
        let mut chart = ChartArgs::new(
            days,
            self.jar_ids,
            self.mode,
            self.chart,
        );
        if let Some(seed) = self.seed {
            chart = chart.with_seed(seed);
        }
        Ok(HistoryArgs::new(chart, self.format))
    }
}

#[tool_router(vis = "pub(super)")]
impl JarviewServer {
    #[tool]
    /// Initialize the jarview MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> std::result::Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// List every jar with its ID, name, target percentage, description and current balance, plus
    /// the total balance across all jars.
    #[tool]
    async fn list_jars(&self) -> std::result::Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_jars called");
        let config = (*self.config).clone();
        tool_result(commands::jars(config, self.mode).await)
    }

    /// Add money to a jar or remove money from it. Returns the updated jar. Removing more than
    /// the balance fails with an insufficient funds error and changes nothing.
    #[tool]
    async fn adjust_balance(
        &self,
        Parameters(params): Parameters<AdjustBalanceParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        require_init!(self);
        info!(
            "MCP: adjust_balance called with jar_id={}, amount={}, direction={}",
            params.jar_id, params.amount, params.direction
        );
        let config = (*self.config).clone();
        let args = AdjustArgs::new(params.jar_id, params.amount);
        tool_result(commands::adjust(config, self.mode, args, params.direction).await)
    }

    /// List transactions, newest first. Give a jar_id to see only transfers into or out of that
    /// jar, or start_date and end_date to see only those made within that range of days.
    #[tool]
    async fn list_transactions(
        &self,
        Parameters(params): Parameters<ListTransactionsParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_transactions called with {params:?}");
        let config = (*self.config).clone();
        let out = match params.into_args() {
            Ok(args) => commands::transactions(config, self.mode, args).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Move money from one jar to another. Returns the created transaction. Fails without
    /// changing anything if the source jar does not hold enough money.
    #[tool]
    async fn transfer(
        &self,
        Parameters(params): Parameters<TransferParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        require_init!(self);
        info!(
            "MCP: transfer called with source_jar_id={}, destination_jar_id={}, amount={}",
            params.source_jar_id, params.destination_jar_id, params.amount
        );
        let config = (*self.config).clone();
        let args = TransferArgs::new(
            params.source_jar_id,
            params.destination_jar_id,
            params.amount,
            params.description,
        );
        tool_result(commands::transfer(config, self.mode, args).await)
    }

    /// The daily balance history of the selected jars, ending today.
    ///
    /// The API keeps no history, so past balances are simulated: each day's value is the current
    /// balance scaled by a random factor between 0.8 and 1.2. Only today's values are real. In
    /// 'percentage' mode each value is the jar's share of that day's total over the selected jars,
    /// rounded to one decimal place so that the shares add up to 100.
    #[tool]
    async fn balance_history(
        &self,
        Parameters(params): Parameters<BalanceHistoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: balance_history called with {params:?}");
        let config = (*self.config).clone();
        let today = Local::now().date_naive();
        let out = match params.into_args() {
            Ok(args) => commands::history(config, self.mode, args, today).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }
}
