use crate::model::Amount;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// The backend's identifier for a jar.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct JarId(pub i64);

impl Display for JarId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for JarId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(JarId)
    }
}

impl From<i64> for JarId {
    fn from(value: i64) -> Self {
        JarId(value)
    }
}

/// A named money bucket with a target allocation and a balance.
///
/// The backend owns jars. The copy held here is whatever the last fetch returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jar {
    pub id: JarId,
    pub name: String,
    /// Target share of income, conceptually 0-100. Jars are not required to sum to 100.
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub description: String,
    pub current_balance: Amount,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Jar {
    /// A jar with only the fields needed for charting filled in.
    pub fn new(id: impl Into<JarId>, name: impl Into<String>, balance: impl Into<Amount>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            percentage: 0.0,
            description: String::new(),
            current_balance: balance.into(),
            created_at: String::new(),
            updated_at: None,
        }
    }
}

/// Looks up a jar by id.
pub fn find_jar(jars: &[Jar], id: JarId) -> Option<&Jar> {
    jars.iter().find(|jar| jar.id == id)
}

/// Whether money goes into or out of a jar.
#[derive(
    Debug,
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
pub enum Direction {
    Add,
    Remove,
}

serde_plain::derive_display_from_serialize!(Direction);
serde_plain::derive_fromstr_from_deserialize!(Direction);

impl Direction {
    /// The last path segment of the balance endpoint, `/jars/{id}/{segment}`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Direction::Add => "add",
            Direction::Remove => "remove",
        }
    }
}
