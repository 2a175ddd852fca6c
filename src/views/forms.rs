//! Dialog form state. Amounts are kept as typed so that a half-typed value can be shown back; they
//! are parsed on submit and never validated further here.

use crate::api::Backend;
use crate::error::{ErrorType, IntoResult};
use crate::model::{
    default_transfer_description, find_jar, Amount, Direction, Jar, JarId, Transaction,
    TransferRequest,
};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// The add money / remove money dialog for one jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceForm {
    pub jar_id: JarId,
    pub direction: Direction,
    pub amount: String,
}

impl BalanceForm {
    pub fn new(jar_id: JarId, direction: Direction) -> Self {
        Self {
            jar_id,
            direction,
            amount: String::new(),
        }
    }

    /// The message shown when submitting fails.
    pub fn failure_message(&self) -> String {
        format!("Failed to {} money", self.direction)
    }

    /// Sends the adjustment and returns the updated jar.
    pub async fn submit(&self, backend: &dyn Backend) -> Result<Jar> {
        let amount = parse_amount(&self.amount)?;
        backend
            .adjust_balance(self.jar_id, amount, self.direction)
            .await
    }
}

/// The transfer dialog.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferForm {
    pub source: Option<JarId>,
    pub destination: Option<JarId>,
    pub amount: String,
    /// Left empty, the description is generated from the jar names.
    pub description: String,
}

impl TransferForm {
    /// Whether both jars are chosen and an amount has been typed.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.destination.is_some() && !self.amount.trim().is_empty()
    }

    /// Builds the request, or `None` while the form is incomplete.
    pub fn request(&self, jars: &[Jar]) -> Result<Option<TransferRequest>> {
        let (Some(source), Some(destination)) = (self.source, self.destination) else {
            return Ok(None);
        };
        if !self.is_complete() {
            return Ok(None);
        }
        let amount = parse_amount(&self.amount)?;
        let description = match self.description.trim() {
            "" => default_transfer_description(
                &jar_label(jars, source),
                &jar_label(jars, destination),
            ),
            given => given.to_string(),
        };
        Ok(Some(TransferRequest::new(
            source,
            destination,
            amount,
            description,
        )))
    }

    /// Sends the transfer. Does nothing and returns `None` while the form is incomplete.
    pub async fn submit(
        &self,
        backend: &dyn Backend,
        jars: &[Jar],
    ) -> Result<Option<Transaction>> {
        match self.request(jars)? {
            Some(request) => backend.transfer(&request).await.map(Some),
            None => Ok(None),
        }
    }
}

fn jar_label(jars: &[Jar], id: JarId) -> String {
    find_jar(jars, id)
        .map(|jar| jar.name.clone())
        .unwrap_or_else(|| format!("jar {id}"))
}

fn parse_amount(s: &str) -> Result<Amount> {
    s.parse::<Amount>()
        .with_context(|| format!("Invalid amount '{s}'"))
        .pub_result(ErrorType::Request)
}
