//! Hold'em table host.
//!
//! Creates the configured tables, each with its own game actor, logs every
//! server-scope event and runs until interrupted.

mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use holdem_engine::{HOUSE, ServerContext, ServerEvent};
use pico_args::Arguments;
use tokio::sync::mpsc;

use config::ServerConfig;

const HELP: &str = "\
Host Texas Hold'em tables

USAGE:
  holdem_server [OPTIONS]

OPTIONS:
  --tables     N           Number of tables to create  [default: env MAX_TABLES or 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  TABLE_NAME               Base name for startup tables
  TABLE_MAX_PLAYERS        Seats per table (2-23)
  TABLE_SMALL_BLIND        Small blind
  TABLE_BIG_BLIND          Big blind
  TABLE_MIN_BUY_IN_BB      Minimum buy-in in big blinds
  TABLE_MAX_BUY_IN_BB      Maximum buy-in in big blinds
  TABLE_AUTO_START         Deal as soon as two players are seated
  SHUFFLE_SEED             Make every shuffle reproducible
  RUST_LOG                 Log filter
  (A .env file in the working directory is read first)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let num_tables: Option<usize> = pargs.opt_value_from_str("--tables")?;

    logging::init();

    let config = ServerConfig::from_env(num_tables)?;
    config.validate()?;

    let context = ServerContext::new();
    let watcher = watch_server_events(&context);

    for i in 0..config.num_tables {
        let table = config.table(i);
        let name = table.name.clone();
        let id = context
            .create_table(table)
            .await
            .with_context(|| format!("Failed to create table '{name}'"))?;
        tracing::debug!("{name} is {id}");
    }

    for table in context.list_tables().await {
        tracing::info!(
            "  - {} ({}) - {}/{} players, blinds: {}",
            table.name,
            table.id,
            table.player_count,
            table.max_players,
            table.blinds
        );
    }

    // Catching signals for exit.
    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
    set_handler(move || {
        let _ = stop_tx.send(());
    })?;
    tracing::info!("Server ready. Press Ctrl+C to stop.");
    stop_rx.recv().await;

    tracing::info!("Shutting down server...");
    context.shutdown().await;
    context.events().unsubscribe(HOUSE);
    let _ = watcher.await;
    Ok(())
}

/// Log everything published in the server scope until the server stops
/// listening.
fn watch_server_events(context: &Arc<ServerContext>) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    context.events().subscribe(HOUSE, Arc::new(tx));
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(target: "server_events", "{event}");
        }
    })
}
