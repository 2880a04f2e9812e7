//! bookshelf-rs server entry point.

use bookshelf_rs::{
    auth::AuthService,
    catalog::CatalogService,
    config::{Cli, Command, Config},
    db::Database,
    server,
    status::ReadStatusService,
    storage::CoverStore,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    // Environment overrides are applied once; the result is immutable.
    let config = config.apply_env();

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        Some(Command::Serve { bind }) => cmd_serve(config, bind).await,
        None => {
            // Default: start server
            cmd_serve(config, None).await
        }
    }
}

/// Initialize config and database.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    // Write default config
    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    // Initialize database
    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    println!(
        "Initialized database: {}",
        config.database.path.display()
    );

    println!("\nEdit config.toml to configure your server.");
    println!("Set auth.jwt_secret (or BOOKSHELF_JWT_SECRET) before serving.");

    Ok(())
}

/// Start the server.
async fn cmd_serve(mut config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    // Override bind address if specified
    if let Some(addr) = bind {
        config.server.bind = addr;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf_rs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret must be set (config file or BOOKSHELF_JWT_SECRET)");
    }

    // Open database
    let db = Database::open(&config.database.path)?;

    // Connect cover storage
    let covers = CoverStore::from_config(&config.storage).await?;

    // Wire up services
    let auth = AuthService::new(db.clone(), &config.auth.jwt_secret, config.auth.token_ttl_hours);
    let catalog = CatalogService::new(db.clone(), covers);
    let status = ReadStatusService::new(db);

    tracing::info!(
        bind = %config.server.bind,
        database = %config.database.path.display(),
        storage = %config.storage.backend,
        "Starting bookshelf-rs server"
    );

    let state = server::AppState::new(auth, catalog, status);
    let app = server::create_router(state);

    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!(address = %config.server.bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
