use chrono::Local;
use clap::Parser;
use jarview::args::{Args, Command};
use jarview::model::Direction;
use jarview::{commands, Config, Mode, Result, DEFAULT_BASE_URL};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().jarview_home().path();

    // When JARVIEW_IN_TEST_MODE is set and non-empty the in-memory backend is used instead of the
    // configured API.
    let mode = Mode::from_env();
    let today = Local::now().date_naive();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => {
            let base_url = init_args
                .api_url()
                .or(args.common().base_url())
                .unwrap_or(DEFAULT_BASE_URL);
            commands::init(home, base_url).await?.print()
        }

        Command::Jars => commands::jars(config(home, &args).await?, mode)
            .await?
            .print(),

        Command::Jar(jar_args) => commands::jar(config(home, &args).await?, mode, jar_args.clone())
            .await?
            .print(),

        Command::Balance(jar_args) => {
            commands::balance(config(home, &args).await?, mode, jar_args.clone())
                .await?
                .print()
        }

        Command::Add(adjust_args) => commands::adjust(
            config(home, &args).await?,
            mode,
            adjust_args.clone(),
            Direction::Add,
        )
        .await?
        .print(),

        Command::Remove(adjust_args) => commands::adjust(
            config(home, &args).await?,
            mode,
            adjust_args.clone(),
            Direction::Remove,
        )
        .await?
        .print(),

        Command::Transfer(transfer_args) => {
            commands::transfer(config(home, &args).await?, mode, transfer_args.clone())
                .await?
                .print()
        }

        Command::Transactions(list_args) => {
            commands::transactions(config(home, &args).await?, mode, list_args.clone())
                .await?
                .print()
        }

        Command::Transaction(show_args) => {
            commands::transaction(config(home, &args).await?, mode, show_args.clone())
                .await?
                .print()
        }

        Command::Dashboard(chart_args) => {
            commands::dashboard(config(home, &args).await?, mode, chart_args.clone(), today)
                .await?
                .print()
        }

        Command::History(history_args) => {
            commands::history(config(home, &args).await?, mode, history_args.clone(), today)
                .await?
                .print()
        }

        Command::Mcp(_mcp_args) => commands::mcp(config(home, &args).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Loads the config file and applies `--base-url` when given.
async fn config(home: &Path, args: &Args) -> Result<Config> {
    let config = Config::load(home).await?;
    match args.common().base_url() {
        Some(base_url) => config.with_base_url(base_url),
        None => Ok(config),
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
