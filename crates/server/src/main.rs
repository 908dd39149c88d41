//! household-server: HTTP backend for shared households.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use household_core::{Config, SystemClock};
use household_server::store::{HouseholdStore, MemoryStore, PgStore};
use household_server::{build_router, db, AppState};

// ── CLI ─────────────────────────────────────────────────────────────

/// Household backend: chores, container turns, and the beer ledger.
#[derive(Parser, Debug)]
#[command(name = "household-server", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
}

fn load_config() -> Config {
    household_core::config::load_dotenv();
    Config::from_env()
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    if !config.postgres.is_configured() {
        anyhow::bail!("PG_USERNAME is not set; nothing to migrate");
    }
    let pool = db::connect(&config.postgres).await?;
    db::run_migrations(&pool).await?;
    info!("Migrations applied to {}", config.postgres.database);
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn HouseholdStore> = match db::init_pg_pool(&config.postgres).await {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => {
            info!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::new(
        store,
        Arc::new(SystemClock),
        config.schedule.clone(),
    ));
    let app = build_router(state, &config.server.cors_origin);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = load_config();
    config.log_summary();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Migrate => migrate(&config).await,
    }
}
