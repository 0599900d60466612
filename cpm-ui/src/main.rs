//! cpm-ui - Chaotic Productivity Method course service
//!
//! Serves the course API: sessions, tier-gated chapters and search, the
//! personal workspace with task reminders, the dashboard and the back office.

use anyhow::Result;
use clap::Parser;
use cpm_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use cpm_common::content::ContentLibrary;
use cpm_common::db::init_database;
use cpm_ui::{accounts, build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "cpm-ui", version, about = "Chaotic Productivity Method course service")]
struct Args {
    /// Root folder holding cpm.db and content.json
    #[arg(long, env = "CPM_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to ~/.config/cpm/config.toml, then /etc/cpm/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Create or promote this account as administrator on startup
    #[arg(long)]
    admin_email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting CPM course service (cpm-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = TomlConfig::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new("cpm-ui")
        .with_cli_arg(args.root_folder)
        .with_toml(config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    if let Some(email) = args.admin_email.or_else(|| config.admin_email.clone()) {
        accounts::bootstrap_admin(&pool, &email).await?;
    }

    let content = ContentLibrary::load_or_builtin(&initializer.content_path());

    let state = AppState::load(pool, content, config.reminders, config.persistence).await?;
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let bind = format!(
        "{}:{}",
        config.bind_address(),
        args.port.unwrap_or_else(|| config.port())
    );
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("cpm-ui listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
