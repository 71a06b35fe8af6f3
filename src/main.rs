use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubroom::config::Config;
use clubroom::AppState;

#[derive(Parser, Debug)]
#[command(name = "clubroom")]
#[command(author, version, about = "A small members-area web server", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "clubroom.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Skip startup self-checks
    #[arg(long)]
    skip_checks: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Clubroom v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Initialize database
    let db = clubroom::db::init(&config.server.data_dir).await?;

    // The session store shares the application database
    let session_store = SqliteStore::new(db.clone());
    session_store.migrate().await?;

    // Run startup self-checks
    if cli.skip_checks {
        tracing::warn!("Startup self-checks skipped (--skip-checks)");
    } else {
        let report = clubroom::startup::run_startup_checks(&config, &db).await;
        if !report.all_critical_passed {
            anyhow::bail!("Startup self-checks failed: {}", report.summary);
        }
    }

    // Ensure the configured bootstrap admin exists
    if let Some(admin) = &config.admin {
        clubroom::web::auth::ensure_admin(&db, admin).await?;
    }

    // Sweep expired sessions in the background
    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let session_layer = clubroom::sessions::session_layer(session_store, &config.session);

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), db));
    let app = clubroom::web::create_router(state, session_layer);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    deletion_task.abort();

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
