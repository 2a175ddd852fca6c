//! Jar commands: listing, showing and adjusting balances.

use crate::api::{self, Mode};
use crate::args::{AdjustArgs, JarArgs};
use crate::commands::{interruptible, Out};
use crate::model::{find_jar, Amount, Direction, Jar, JarId};
use crate::series::total_balance;
use crate::views::render::jar_table;
use crate::views::DashboardState;
use crate::{Config, Result};
use serde::Serialize;
use tracing::info;

/// The balance of one jar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub jar_id: JarId,
    pub balance: Amount,
}

/// Lists every jar and the total across them.
pub async fn jars(config: Config, mode: Mode) -> Result<Out<Vec<Jar>>> {
    let backend = api::backend(&config, mode)?;
    let jars = interruptible(backend.list_jars()).await?;
    if jars.is_empty() {
        return Ok(Out::new("There are no jars", jars));
    }
    let message = format!(
        "{}\nTotal balance: {}",
        jar_table(&jars),
        total_balance(&jars)
    );
    Ok(Out::new(message, jars))
}

/// Shows one jar.
pub async fn jar(config: Config, mode: Mode, args: JarArgs) -> Result<Out<Jar>> {
    let backend = api::backend(&config, mode)?;
    let jar = interruptible(backend.get_jar(args.id())).await?;
    Ok(Out::new(jar_table(std::slice::from_ref(&jar)), jar))
}

/// Shows the balance of one jar.
pub async fn balance(config: Config, mode: Mode, args: JarArgs) -> Result<Out<Balance>> {
    let backend = api::backend(&config, mode)?;
    let balance = interruptible(backend.get_balance(args.id())).await?;
    Ok(Out::new(
        balance.to_string(),
        Balance {
            jar_id: args.id(),
            balance,
        },
    ))
}

/// Adds money to or removes money from a jar through the dashboard's balance dialog.
pub async fn adjust(
    config: Config,
    mode: Mode,
    args: AdjustArgs,
    direction: Direction,
) -> Result<Out<Jar>> {
    let backend = api::backend(&config, mode)?;
    let mut state = DashboardState::new(
        config.recent_transactions(),
        config.palette(),
        config.default_time_range(),
    );
    state.open_balance_dialog(args.id(), direction);
    state.set_amount(args.amount());
    let Some(jar) = interruptible(state.submit_balance(backend.as_ref())).await? else {
        return Ok("Nothing was submitted".into());
    };

    // The refreshed jar list carries the balance after any concurrent changes.
    let jar = find_jar(state.jars(), jar.id).cloned().unwrap_or(jar);
    let amount = args
        .amount()
        .parse::<Amount>()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| args.amount().to_string());
    let message = match direction {
        Direction::Add => format!("Added {amount} to {}", jar.name),
        Direction::Remove => format!("Removed {amount} from {}", jar.name),
    };
    let message = format!("{message}, the balance is now {}", jar.current_balance);
    info!("{message}");
    Ok(Out::new(message, jar))
}
