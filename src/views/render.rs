//! Text renderings of the screens: markdown tables, horizontal bars, JSON and CSV.

use crate::model::{Jar, JarId, Transaction};
use crate::series::{ChartKind, DayRecord, SeriesDescriptor, Slice, ViewMode};
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

const BAR_WIDTH: usize = 40;
const BAR: char = '█';

/// The format of the history dataset.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A markdown table, or bars for a bar chart.
    #[default]
    Table,
    /// An array of objects, one per day, keyed by series key.
    Json,
    /// One row per day, one column per series.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// A rendered history dataset.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rendered {
    Json(serde_json::Value),
    Table(String),
    Csv(String),
}

impl Debug for Rendered {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rendered::Json(v) => write!(f, "Rendered::Json({v:?})"),
            Rendered::Table(s) => write!(f, "Rendered::Table({} chars)", s.len()),
            Rendered::Csv(s) => write!(f, "Rendered::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rendered {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rendered::Json(v) => match serde_json::to_string_pretty(v) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => write!(f, "{v}"),
            },
            Rendered::Table(s) | Rendered::Csv(s) => write!(f, "{s}"),
        }
    }
}

/// Renders a markdown table. Pipes inside cells are escaped.
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let escape = |s: &str| s.replace('|', "\\|").replace('\n', " ");
    let mut out = String::new();
    let headers: Vec<String> = headers.iter().map(|h| escape(h)).collect();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    out.push_str(&format!(
        "|{}\n",
        headers.iter().map(|_| "---|").collect::<String>()
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

/// The jar cards as a table.
pub fn jar_table(jars: &[Jar]) -> String {
    let rows: Vec<Vec<String>> = jars
        .iter()
        .map(|jar| {
            vec![
                jar.id.to_string(),
                jar.name.clone(),
                format!("{}%", jar.percentage),
                jar.current_balance.to_string(),
                jar.description.clone(),
            ]
        })
        .collect();
    markdown_table(&["ID", "Jar", "Target", "Balance", "Description"], &rows)
}

/// Transactions as a table. Jar names come from the embedded snapshots or from `jars`.
pub fn transaction_table(transactions: &[Transaction], jars: &[Jar]) -> String {
    let rows: Vec<Vec<String>> = transactions
        .iter()
        .map(|t| {
            let name = |n: Option<&str>, id: JarId| {
                n.map(str::to_string).unwrap_or_else(|| format!("#{id}"))
            };
            vec![
                t.id.to_string(),
                t.date()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| t.transaction_date.clone()),
                name(t.source_name(jars), t.source_jar_id),
                name(t.destination_name(jars), t.destination_jar_id),
                t.amount.to_string(),
                t.description.clone(),
            ]
        })
        .collect();
    markdown_table(&["ID", "Date", "From", "To", "Amount", "Description"], &rows)
}

/// Draws a bar for `value` scaled so that `max` fills `BAR_WIDTH`. Non-positive values draw
/// nothing.
pub fn bar(value: f64, max: f64) -> String {
    if !(value > 0.0 && max > 0.0) {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    std::iter::repeat_n(BAR, len.clamp(1, BAR_WIDTH)).collect()
}

/// The money distribution as labelled bars scaled to the largest share.
pub fn distribution_bars(slices: &[Slice]) -> String {
    let max = slices.iter().map(|s| s.share).fold(0.0, f64::max);
    let width = label_width(slices.iter().map(|s| s.label.as_str()));
    slices
        .iter()
        .map(|s| {
            format!(
                "{:width$}  {:<bar_width$}  {:>5.1}%  {}\n",
                s.label,
                bar(s.share, max),
                s.share,
                s.value,
                bar_width = BAR_WIDTH
            )
        })
        .collect()
}

/// Renders the history dataset.
///
/// - `Table` with `ChartKind::Line` is a markdown table with one column per series
/// - `Table` with `ChartKind::Bar` is a block of bars per day
/// - `Json` is every day's full record, each jar's absolute and percentage values listed by id
/// - `Csv` has one column per series in the current view mode
pub fn history(
    records: &[DayRecord],
    series: &[SeriesDescriptor],
    mode: ViewMode,
    kind: ChartKind,
    format: OutputFormat,
) -> anyhow::Result<Rendered> {
    Ok(match format {
        OutputFormat::Table => Rendered::Table(match kind {
            ChartKind::Line => history_table(records, series, mode),
            ChartKind::Bar => history_bars(records, series, mode),
        }),
        OutputFormat::Json => Rendered::Json(history_json(records)?),
        OutputFormat::Csv => Rendered::Csv(history_csv(records, series)?),
    })
}

fn history_table(records: &[DayRecord], series: &[SeriesDescriptor], mode: ViewMode) -> String {
    let mut headers = vec!["Date"];
    headers.extend(series.iter().map(|s| s.data_key.as_str()));
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let mut row = vec![record.date.to_string()];
            row.extend(series.iter().map(|s| {
                s.value(record)
                    .map(|v| mode.format_value(v))
                    .unwrap_or_default()
            }));
            row
        })
        .collect();
    markdown_table(&headers, &rows)
}

fn history_bars(records: &[DayRecord], series: &[SeriesDescriptor], mode: ViewMode) -> String {
    let max = records
        .iter()
        .flat_map(|r| series.iter().filter_map(|s| s.value(r)))
        .fold(0.0, f64::max);
    let width = label_width(series.iter().map(|s| s.label.as_str()));
    let mut out = String::new();
    for record in records {
        out.push_str(&format!("{}\n", record.date));
        for s in series {
            let value = s.value(record).unwrap_or_default();
            out.push_str(&format!(
                "  {:width$}  {:<bar_width$}  {}\n",
                s.label,
                bar(value, max),
                mode.format_value(value),
                bar_width = BAR_WIDTH
            ));
        }
    }
    out
}

fn history_json(records: &[DayRecord]) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(records).context("Unable to serialize the history")
}

fn history_csv(records: &[DayRecord], series: &[SeriesDescriptor]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["date".to_string()];
    header.extend(series.iter().map(|s| s.data_key.clone()));
    writer.write_record(&header).context("Unable to write CSV header")?;
    for record in records {
        let mut row = vec![record.date.to_string()];
        row.extend(series.iter().map(|s| {
            s.value(record)
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default()
        }));
        writer.write_record(&row).context("Unable to write CSV row")?;
    }
    let bytes = writer.into_inner().context("Unable to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.map(|l| l.chars().count()).max().unwrap_or(0)
}
