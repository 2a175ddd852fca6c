//! Derivation of the balance-history dataset that the charts are drawn from.
//!
//! `derive_series` produces one `DayRecord` per calendar day, oldest first and ending today. Each
//! record holds, for every selected jar, the jar's balance on that day and its share of that
//! day's total. Both values are kept so that a view can switch between absolute and percentage
//! display without deriving the dataset again.
//!
//! Everything here is pure and synchronous. Randomness, if any, comes from the `HistorySource`
//! handed in by the caller.

mod chart;
mod history;

pub use chart::{
    assemble_series, distribution, project, total_balance, ChartKind, Palette, SeriesDescriptor,
    Slice, ViewMode, DEFAULT_PALETTE,
};
pub use history::{FlatHistory, HistorySource, RandomJitter, JITTER_MAX, JITTER_MIN};

use crate::model::{Jar, JarId};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

/// A positive number of days of history, counted backwards from today and including today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeRange(NonZeroU32);

impl TimeRange {
    pub const WEEK: TimeRange = TimeRange(NonZeroU32::MIN.saturating_add(6));
    pub const MONTH: TimeRange = TimeRange(NonZeroU32::MIN.saturating_add(29));
    pub const QUARTER: TimeRange = TimeRange(NonZeroU32::MIN.saturating_add(89));

    /// The ranges offered by the dashboard's time range selector.
    pub const PRESETS: [TimeRange; 3] = [Self::WEEK, Self::MONTH, Self::QUARTER];

    /// The longest range accepted, one hundred years.
    pub const MAX_DAYS: u32 = 36_525;

    /// Returns `None` when `days` is zero or longer than `MAX_DAYS`.
    pub fn new(days: u32) -> Option<Self> {
        if days > Self::MAX_DAYS {
            return None;
        }
        NonZeroU32::new(days).map(Self)
    }

    pub fn days(&self) -> u32 {
        self.0.get()
    }

    /// The calendar days covered by this range, oldest first, ending with `today`.
    pub fn dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        (0..self.days())
            .rev()
            .map(|back| {
                today
                    .checked_sub_days(Days::new(u64::from(back)))
                    .unwrap_or(NaiveDate::MIN)
            })
            .collect()
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::WEEK
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Days", self.days())
    }
}

impl TryFrom<u32> for TimeRange {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        TimeRange::new(days).ok_or_else(|| {
            format!(
                "A time range must be between 1 and {} days, got {days}",
                TimeRange::MAX_DAYS
            )
        })
    }
}

impl From<TimeRange> for u32 {
    fn from(range: TimeRange) -> Self {
        range.days()
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days: u32 = s
            .trim()
            .parse()
            .map_err(|e| format!("Invalid number of days '{s}': {e}"))?;
        TimeRange::try_from(days)
    }
}

/// One selected jar's values on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayValue {
    pub jar_id: JarId,
    pub name: String,
    /// The jar's (simulated) balance.
    pub absolute: f64,
    /// `100 * absolute / total`, one decimal place. Zero when the day's total is zero.
    pub percentage: f64,
}

/// The values of every selected jar on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    /// The sum of the absolute values of the selected jars.
    pub total: f64,
    /// One entry per selected jar, in the order of the jar collection.
    pub values: Vec<DayValue>,
}

impl DayRecord {
    pub fn value(&self, jar_id: JarId) -> Option<&DayValue> {
        self.values.iter().find(|v| v.jar_id == jar_id)
    }

    /// Whether the record carries no per-jar values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The record as a flat mapping from series key (`name` for the absolute value, `name %` for
    /// the percentage) to value.
    pub fn keyed(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for v in &self.values {
            map.insert(ViewMode::Absolute.series_key(&v.name), v.absolute);
            map.insert(ViewMode::Percentage.series_key(&v.name), v.percentage);
        }
        map
    }
}

/// Derives the dataset for the history chart.
///
/// Returns exactly `range.days()` records, oldest first, the last one dated `today`. Jars whose
/// id is not in `selected` are ignored. When nothing is selected every record has an empty
/// `values` list and a total of zero.
pub fn derive_series<H>(
    jars: &[Jar],
    selected: &BTreeSet<JarId>,
    range: TimeRange,
    today: NaiveDate,
    history: &mut H,
) -> Vec<DayRecord>
where
    H: HistorySource + ?Sized,
{
    let included: Vec<&Jar> = jars.iter().filter(|j| selected.contains(&j.id)).collect();

    range
        .dates(today)
        .into_iter()
        .map(|date| {
            let absolutes: Vec<f64> = included
                .iter()
                .map(|jar| history.balance_on(jar, date))
                .collect();
            let total: f64 = absolutes.iter().sum();
            let shares = percentages(&absolutes, total);
            let values = included
                .iter()
                .zip(absolutes)
                .zip(shares)
                .map(|((jar, absolute), percentage)| DayValue {
                    jar_id: jar.id,
                    name: jar.name.clone(),
                    absolute,
                    percentage,
                })
                .collect();
            DayRecord {
                date,
                total,
                values,
            }
        })
        .collect()
}

/// Computes each value's share of `total` in percent, rounded to one decimal place.
///
/// Rounding uses the largest-remainder method on tenths of a percent so that the shares add up
/// to exactly 100.0. A single share may therefore be 0.1 above plain rounding, e.g. three equal
/// values give 33.4, 33.3, 33.3. A zero (or non-finite) total gives all zeros.
pub(crate) fn percentages(values: &[f64], total: f64) -> Vec<f64> {
    if values.is_empty() || total == 0.0 || !total.is_finite() {
        return vec![0.0; values.len()];
    }

    // Work in tenths of a percent.
    let raw: Vec<f64> = values.iter().map(|v| v / total * 1000.0).collect();
    let mut tenths: Vec<f64> = raw.iter().map(|r| r.floor()).collect();
    let assigned: f64 = tenths.iter().sum();
    let missing = (1000.0 - assigned).round().clamp(0.0, values.len() as f64) as usize;

    let mut by_remainder: Vec<usize> = (0..raw.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = raw[a] - tenths[a];
        let rb = raw[b] - tenths[b];
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &ix in by_remainder.iter().take(missing) {
        tenths[ix] += 1.0;
    }

    tenths.into_iter().map(|t| t / 10.0).collect()
}
