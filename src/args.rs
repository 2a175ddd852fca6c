//! These structs provide the CLI interface for the jarview CLI.

use crate::model::{JarId, TransactionId};
use crate::series::{ChartKind, TimeRange, ViewMode};
use crate::views::render::OutputFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// jarview: A command-line dashboard for money jars.
///
/// Your money is split across jars, each with a target share of your income. The jars and the
/// transfers between them live in a budgeting API. This program shows their balances, how the
/// money is distributed, a chart of balance history, and lets you add, remove and move money.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// Run this once before anything else. Pass the base URL of the budgeting API as --base-url,
    /// and --jarview-home if you want the data directory somewhere other than $HOME/jarview.
    Init(InitArgs),
    /// List every jar with its target share and balance.
    Jars,
    /// Show one jar.
    Jar(JarArgs),
    /// Show the current balance of one jar.
    Balance(JarArgs),
    /// Add money to a jar.
    Add(AdjustArgs),
    /// Remove money from a jar.
    Remove(AdjustArgs),
    /// Move money from one jar to another.
    Transfer(TransferArgs),
    /// List transactions, optionally for one jar or within a date range.
    Transactions(TransactionsArgs),
    /// Show one transaction.
    Transaction(TransactionArgs),
    /// Show the dashboard: totals, the money distribution, the balance history and the most
    /// recent transactions.
    Dashboard(ChartArgs),
    /// Print the balance history dataset.
    History(HistoryArgs),
    /// Run the MCP server on stdio for use by an AI agent.
    Mcp(McpArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where jarview configuration is held. Defaults to ~/jarview
    #[arg(long, env = "JARVIEW_HOME", default_value_t = default_jarview_home())]
    jarview_home: DisplayPath,

    /// Talk to this API instead of the one in the config file. Not saved.
    #[arg(long, env = "JARVIEW_BASE_URL")]
    base_url: Option<String>,
}

impl Common {
    pub fn new(log_level: LevelFilter, jarview_home: PathBuf, base_url: Option<String>) -> Self {
        Self {
            log_level,
            jarview_home: jarview_home.into(),
            base_url,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn jarview_home(&self) -> &DisplayPath {
        &self.jarview_home
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

/// Args for the `jarview init` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the budgeting API to save in the config file. Falls back to the global
    /// --base-url, then to https://localhost:7042/api
    #[arg(long = "base-url")]
    api_url: Option<String>,
}

impl InitArgs {
    pub fn new(api_url: Option<String>) -> Self {
        Self { api_url }
    }

    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }
}

/// Args for commands that act on one jar.
#[derive(Debug, Parser, Clone)]
pub struct JarArgs {
    /// The jar ID.
    id: JarId,
}

impl JarArgs {
    pub fn new(id: impl Into<JarId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> JarId {
        self.id
    }
}

/// Args for the `jarview add` and `jarview remove` commands.
#[derive(Debug, Parser, Clone)]
pub struct AdjustArgs {
    /// The jar ID.
    id: JarId,

    /// The amount, e.g. 25, 25.50 or $1,200.
    amount: String,
}

impl AdjustArgs {
    pub fn new(id: impl Into<JarId>, amount: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount: amount.into(),
        }
    }

    pub fn id(&self) -> JarId {
        self.id
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

/// Args for the `jarview transfer` command.
#[derive(Debug, Parser, Clone)]
pub struct TransferArgs {
    /// The jar the money comes out of.
    #[arg(long)]
    from: JarId,

    /// The jar the money goes into.
    #[arg(long)]
    to: JarId,

    /// The amount to move.
    #[arg(long)]
    amount: String,

    /// Defaults to "Transfer from <source> to <destination>".
    #[arg(long)]
    description: Option<String>,
}

impl TransferArgs {
    pub fn new(
        from: impl Into<JarId>,
        to: impl Into<JarId>,
        amount: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            description,
        }
    }

    pub fn from(&self) -> JarId {
        self.from
    }

    pub fn to(&self) -> JarId {
        self.to
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Args for the `jarview transactions` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct TransactionsArgs {
    /// Only transactions into or out of this jar.
    #[arg(long, conflicts_with_all = ["start", "end"])]
    jar: Option<JarId>,

    /// The first day of the range, e.g. 2025-01-01. Requires --end.
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// The last day of the range, included. Requires --start.
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
}

impl TransactionsArgs {
    pub fn new(jar: Option<JarId>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { jar, start, end }
    }

    pub fn jar(&self) -> Option<JarId> {
        self.jar
    }

    /// Both ends of the date range, when given.
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.start.zip(self.end)
    }
}

/// Args for the `jarview transaction` command.
#[derive(Debug, Parser, Clone)]
pub struct TransactionArgs {
    /// The transaction ID.
    id: TransactionId,
}

impl TransactionArgs {
    pub fn new(id: impl Into<TransactionId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }
}

/// Chart options shared by `jarview dashboard` and `jarview history`.
#[derive(Debug, Default, Parser, Clone)]
pub struct ChartArgs {
    /// How many days of history to show, counting back from today. Defaults to the configured
    /// value, normally 7.
    #[arg(long)]
    days: Option<TimeRange>,

    /// Comma-separated jar IDs to chart. Defaults to every jar.
    #[arg(long, value_delimiter = ',')]
    jars: Option<Vec<JarId>>,

    /// Show balances in dollars or as a share of the day's total.
    #[arg(long, value_enum, default_value_t = ViewMode::Absolute)]
    mode: ViewMode,

    /// Draw the history as a line chart (a table) or as bars.
    #[arg(long, value_enum, default_value_t = ChartKind::Line)]
    chart: ChartKind,

    /// Seed the simulated history so that the output is repeatable.
    #[arg(long)]
    seed: Option<u64>,
}

impl ChartArgs {
    /// `jars` of `None` charts every jar, an empty list charts none.
    pub fn new(
        days: Option<TimeRange>,
        jars: Option<Vec<JarId>>,
        mode: ViewMode,
        chart: ChartKind,
    ) -> Self {
        Self {
            days,
            jars,
            mode,
            chart,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn days(&self) -> Option<TimeRange> {
        self.days
    }

    pub fn jars(&self) -> Option<&[JarId]> {
        self.jars.as_deref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn chart(&self) -> ChartKind {
        self.chart
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Args for the `jarview history` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct HistoryArgs {
    #[clap(flatten)]
    chart: ChartArgs,

    /// The output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl HistoryArgs {
    pub fn new(chart: ChartArgs, format: OutputFormat) -> Self {
        Self { chart, format }
    }

    pub fn chart(&self) -> &ChartArgs {
        &self.chart
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Args for the `jarview mcp` command.
#[derive(Debug, Parser, Clone)]
pub struct McpArgs {}

fn default_jarview_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("jarview"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --jarview-home or JARVIEW_HOME instead of relying on the \
                default home directory.",
            );
            PathBuf::from("jarview")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut all = vec!["jarview", "--jarview-home", "/tmp/jarview-args-test"];
        all.extend_from_slice(args);
        Args::try_parse_from(all).unwrap()
    }

    #[test]
    fn test_history_args() {
        let args = parse(&[
            "history", "--days", "30", "--jars", "1,3", "--mode", "percentage", "--chart", "bar",
            "--format", "csv", "--seed", "7",
        ]);
        let Command::History(history) = args.command() else {
            panic!("expected history");
        };
        assert_eq!(history.chart().days(), Some(TimeRange::MONTH));
        assert_eq!(history.chart().jars(), Some(&[JarId(1), JarId(3)][..]));
        assert_eq!(history.chart().mode(), ViewMode::Percentage);
        assert_eq!(history.chart().chart(), ChartKind::Bar);
        assert_eq!(history.chart().seed(), Some(7));
        assert_eq!(history.format(), OutputFormat::Csv);
    }

    #[test]
    fn test_zero_days_is_rejected() {
        let result = Args::try_parse_from(["jarview", "history", "--days", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_transactions_range_needs_both_ends() {
        let result = Args::try_parse_from(["jarview", "transactions", "--start", "2025-01-01"]);
        assert!(result.is_err());
        let args = parse(&["transactions", "--start", "2025-01-01", "--end", "2025-01-31"]);
        let Command::Transactions(t) = args.command() else {
            panic!("expected transactions");
        };
        assert_eq!(
            t.range(),
            Some((
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
            ))
        );
    }

    #[test]
    fn test_transfer_args() {
        let args = parse(&["transfer", "--from", "1", "--to", "2", "--amount", "$25"]);
        let Command::Transfer(t) = args.command() else {
            panic!("expected transfer");
        };
        assert_eq!(t.from(), JarId(1));
        assert_eq!(t.to(), JarId(2));
        assert_eq!(t.amount(), "$25");
        assert_eq!(t.description(), None);
    }
}
