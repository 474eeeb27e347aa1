use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use metropay::cli::{Cli, Commands};
use metropay::core::{config, init_logger};
use metropay::storage::create_pool;
use metropay::telegram::notifications::{spawn_retry_loop, TelegramNotifier};
use metropay::telegram::{create_bot, Notifier};
use metropay::webhook::run_webhook_server;

/// Main entry point for the payment callback service
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run { port }) => run_service(port).await,
        Some(Commands::InitDb) => run_init_db(),
        None => {
            log::info!("No command specified, running callback server in default mode");
            run_service(None).await
        }
    }
}

/// Run the callback server with the notification retry loop
async fn run_service(port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(*config::WEBHOOK_PORT);

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH)
            .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    log::info!("Using database at {}", config::DATABASE_PATH.as_str());

    let bot = create_bot()?;
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot));

    if config::WEBHOOK_SECRET.is_none() {
        log::warn!("WEBHOOK_SECRET not set - callbacks are accepted without signature checks");
    }

    // Re-deliver notifications that failed their inline send attempt
    spawn_retry_loop(Arc::clone(&db_pool), Arc::clone(&notifier));

    run_webhook_server(
        port,
        db_pool,
        notifier,
        config::WEBHOOK_SECRET.clone(),
    )
    .await
}

/// Create the schema and exit (used on fresh deployments)
fn run_init_db() -> Result<()> {
    create_pool(&config::DATABASE_PATH)
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
    log::info!("Database schema ready at {}", config::DATABASE_PATH.as_str());
    Ok(())
}
