//! Turns jars and derived day records into what a chart needs: series descriptors with labels,
//! keys and colors, and pie-chart slices.

use crate::model::{Amount, Jar, JarId};
use crate::series::{percentages, DayRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The colors used by the reference dashboard.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D",
];

/// Whether chart values are currency amounts or each jar's percentage of the day's total.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Absolute,
    Percentage,
}

serde_plain::derive_display_from_serialize!(ViewMode);
serde_plain::derive_fromstr_from_deserialize!(ViewMode);

impl ViewMode {
    /// The dataset key of a jar's series: the jar name, with a ` %` suffix for percentages.
    pub fn series_key(&self, jar_name: &str) -> String {
        match self {
            ViewMode::Absolute => jar_name.to_string(),
            ViewMode::Percentage => format!("{jar_name} %"),
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            ViewMode::Absolute => "Amount ($)",
            ViewMode::Percentage => "Percentage (%)",
        }
    }

    /// Formats a chart value: `$1,234.50` or `12.5%`.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            ViewMode::Absolute => Amount::from_f64(value).to_string(),
            ViewMode::Percentage => format!("{value:.1}%"),
        }
    }
}

/// How the history chart is drawn.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

serde_plain::derive_display_from_serialize!(ChartKind);
serde_plain::derive_fromstr_from_deserialize!(ChartKind);

/// Selects the value shown for `jar_id` in the given mode. `None` if the jar is not in the
/// record.
pub fn project(record: &DayRecord, jar_id: JarId, mode: ViewMode) -> Option<f64> {
    record.value(jar_id).map(|v| match mode {
        ViewMode::Absolute => v.absolute,
        ViewMode::Percentage => v.percentage,
    })
}

/// An ordered list of colors. Series colors are assigned by position and wrap around when there
/// are more series than colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Palette {
    colors: Vec<String>,
}

impl From<Vec<String>> for Palette {
    fn from(colors: Vec<String>) -> Self {
        Palette::new(colors)
    }
}

impl From<Palette> for Vec<String> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

impl Palette {
    /// A palette of `colors`. An empty list gives the default palette.
    pub fn new<S: Into<String>>(colors: impl IntoIterator<Item = S>) -> Self {
        let colors: Vec<String> = colors.into_iter().map(Into::into).collect();
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    /// The color for the series at `index`.
    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Describes one plotted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub jar_id: JarId,
    /// The legend label, the jar name.
    pub label: String,
    /// The dataset key the values are read from, see `ViewMode::series_key`.
    pub data_key: String,
    pub mode: ViewMode,
    pub color: String,
}

impl SeriesDescriptor {
    /// Reads this series' value out of a day record.
    pub fn value(&self, record: &DayRecord) -> Option<f64> {
        project(record, self.jar_id, self.mode)
    }
}

/// Builds one series per selected jar, in the order of `jars`. Colors are taken from `palette` by
/// the jar's position among the selected jars, so the same selection always gets the same colors.
pub fn assemble_series(
    jars: &[Jar],
    selected: &BTreeSet<JarId>,
    mode: ViewMode,
    palette: &Palette,
) -> Vec<SeriesDescriptor> {
    jars.iter()
        .filter(|jar| selected.contains(&jar.id))
        .enumerate()
        .map(|(ix, jar)| SeriesDescriptor {
            jar_id: jar.id,
            label: jar.name.clone(),
            data_key: mode.series_key(&jar.name),
            mode,
            color: palette.color(ix).to_string(),
        })
        .collect()
}

/// One slice of the money distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub jar_id: JarId,
    pub label: String,
    pub value: Amount,
    /// Share of the total balance in percent, one decimal place.
    pub share: f64,
    pub color: String,
}

/// The money distribution across all jars, one slice per jar in collection order.
pub fn distribution(jars: &[Jar], palette: &Palette) -> Vec<Slice> {
    let values: Vec<f64> = jars.iter().map(|j| j.current_balance.to_f64()).collect();
    let total: f64 = values.iter().sum();
    let shares = percentages(&values, total);
    jars.iter()
        .zip(shares)
        .enumerate()
        .map(|(ix, (jar, share))| Slice {
            jar_id: jar.id,
            label: jar.name.clone(),
            value: jar.current_balance,
            share,
            color: palette.color(ix).to_string(),
        })
        .collect()
}

/// The sum of all jar balances.
pub fn total_balance(jars: &[Jar]) -> Amount {
    jars.iter().map(|j| j.current_balance).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{derive_series, FlatHistory, TimeRange};
    use chrono::NaiveDate;

    fn seven_jars() -> Vec<Jar> {
        (1..=7)
            .map(|i| Jar::new(i, format!("J{i}"), 10 * i))
            .collect()
    }

    fn ids(jars: &[Jar]) -> BTreeSet<JarId> {
        jars.iter().map(|j| j.id).collect()
    }

    #[test]
    fn test_seventh_series_reuses_first_color() {
        let jars = seven_jars();
        let series = assemble_series(&jars, &ids(&jars), ViewMode::Absolute, &Palette::default());
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].color, "#0088FE");
        assert_eq!(series[5].color, "#82CA9D");
        assert_eq!(series[6].color, series[0].color);
    }

    #[test]
    fn test_colors_are_stable() {
        let jars = seven_jars();
        let selected: BTreeSet<JarId> = [JarId(2), JarId(5), JarId(7)].into_iter().collect();
        let a = assemble_series(&jars, &selected, ViewMode::Percentage, &Palette::default());
        let b = assemble_series(&jars, &selected, ViewMode::Percentage, &Palette::default());
        assert_eq!(a, b);
        let colors: Vec<&str> = a.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec!["#0088FE", "#00C49F", "#FFBB28"]);
    }

    #[test]
    fn test_series_keys_follow_mode() {
        let jars = vec![Jar::new(1, "Rent", 1000)];
        let abs = assemble_series(&jars, &ids(&jars), ViewMode::Absolute, &Palette::default());
        let pct = assemble_series(&jars, &ids(&jars), ViewMode::Percentage, &Palette::default());
        assert_eq!(abs[0].data_key, "Rent");
        assert_eq!(pct[0].data_key, "Rent %");
        assert_eq!(abs[0].label, pct[0].label);
    }

    #[test]
    fn test_descriptor_reads_record() {
        let jars = vec![Jar::new(1, "Rent", 300), Jar::new(2, "Food", 100)];
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records = derive_series(
            &jars,
            &ids(&jars),
            TimeRange::new(1).unwrap(),
            day,
            &mut FlatHistory,
        );
        let abs = assemble_series(&jars, &ids(&jars), ViewMode::Absolute, &Palette::default());
        let pct = assemble_series(&jars, &ids(&jars), ViewMode::Percentage, &Palette::default());
        assert_eq!(abs[0].value(&records[0]), Some(300.0));
        assert_eq!(pct[1].value(&records[0]), Some(25.0));
        assert_eq!(project(&records[0], JarId(9), ViewMode::Absolute), None);
    }

    #[test]
    fn test_custom_palette_wraps() {
        let palette = Palette::new(["red", "blue"]);
        assert_eq!(palette.color(0), "red");
        assert_eq!(palette.color(3), "blue");
        assert_eq!(Palette::new(Vec::<String>::new()), Palette::default());
    }

    #[test]
    fn test_empty_palette_from_json_is_default() {
        let palette: Palette = serde_json::from_str("[]").unwrap();
        assert_eq!(palette, Palette::default());
        assert_eq!(palette.color(0), "#0088FE");

        let palette: Palette = serde_json::from_str(r##"["#111111"]"##).unwrap();
        assert_eq!(palette.color(3), "#111111");
        assert_eq!(serde_json::to_string(&palette).unwrap(), r##"["#111111"]"##);
    }

    #[test]
    fn test_total_balance_saturates() {
        let huge = Amount::new("50000000000000000000000000000".parse().unwrap());
        let jars = vec![Jar::new(1, "A", huge), Jar::new(2, "B", huge)];
        assert_eq!(total_balance(&jars).value(), rust_decimal::Decimal::MAX);
    }

    #[test]
    fn test_distribution_and_total() {
        let jars = vec![Jar::new(1, "Rent", 750), Jar::new(2, "Food", 250)];
        let slices = distribution(&jars, &Palette::default());
        assert_eq!(slices[0].share, 75.0);
        assert_eq!(slices[1].share, 25.0);
        assert_eq!(slices[1].color, "#00C49F");
        assert_eq!(total_balance(&jars), Amount::from(1000));
        assert_eq!(total_balance(&[]), Amount::ZERO);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(ViewMode::Absolute.format_value(1234.5), "$1,234.50");
        assert_eq!(ViewMode::Percentage.format_value(12.25), "12.2%");
        assert_eq!(ViewMode::Percentage.axis_label(), "Percentage (%)");
        assert_eq!("bar".parse::<ChartKind>().unwrap(), ChartKind::Bar);
    }
}
