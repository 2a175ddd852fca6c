use crate::model::{Amount, Jar, JarId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// The backend's identifier for a transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub i64);

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for TransactionId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TransactionId)
    }
}

impl From<i64> for TransactionId {
    fn from(value: i64) -> Self {
        TransactionId(value)
    }
}

/// A movement of money from one jar to another. Transactions are never changed once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub id: TransactionId,
    pub source_jar_id: JarId,
    pub destination_jar_id: JarId,
    pub amount: Amount,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transaction_date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Snapshot of the source jar, included by the backend for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_jar: Option<Jar>,
    /// Snapshot of the destination jar, included by the backend for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_jar: Option<Jar>,
}

impl Transaction {
    /// The name of the source jar: the embedded snapshot when present, otherwise a lookup in
    /// `jars`.
    pub fn source_name<'a>(&'a self, jars: &'a [Jar]) -> Option<&'a str> {
        jar_name(self.source_jar.as_ref(), self.source_jar_id, jars)
    }

    /// The name of the destination jar, see `source_name`.
    pub fn destination_name<'a>(&'a self, jars: &'a [Jar]) -> Option<&'a str> {
        jar_name(self.destination_jar.as_ref(), self.destination_jar_id, jars)
    }

    /// The calendar date of the transaction, if the backend sent a parseable timestamp.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.transaction_date)
    }

    /// The transaction timestamp in UTC. Timestamps without an offset are taken to be UTC.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.transaction_date)
    }
}

fn jar_name<'a>(embedded: Option<&'a Jar>, id: JarId, jars: &'a [Jar]) -> Option<&'a str> {
    embedded
        .or_else(|| jars.iter().find(|jar| jar.id == id))
        .map(|jar| jar.name.as_str())
}

/// A request to move `amount` from one jar to another. The backend answers with the created
/// `Transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_jar_id: JarId,
    pub destination_jar_id: JarId,
    pub amount: Amount,
    pub description: String,
}

impl TransferRequest {
    pub fn new(
        source_jar_id: impl Into<JarId>,
        destination_jar_id: impl Into<JarId>,
        amount: impl Into<Amount>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source_jar_id: source_jar_id.into(),
            destination_jar_id: destination_jar_id.into(),
            amount: amount.into(),
            description: description.into(),
        }
    }
}

/// The description used when the user does not write one.
pub fn default_transfer_description(source: &str, destination: &str) -> String {
    format!("Transfer from {source} to {destination}")
}

/// Parses the date part of an ISO-8601 timestamp. Accepts RFC 3339 with an offset, a naive
/// timestamp with optional fractional seconds, or a bare date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, NAIVE_FORMAT) {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parses an ISO-8601 timestamp into UTC. A bare date is midnight.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, NAIVE_FORMAT) {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Formats a timestamp the way the backend writes them, without an offset.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
}

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
