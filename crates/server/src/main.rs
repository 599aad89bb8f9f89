use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statif_core::{
    create_lifecycle, load_config, validate_config, verify_paths, Collaborators, FileLockManager,
    FileStatusStore, LockManager, ProcessCrawler, ScriptDeployer, SqliteConnector, TarArchiver,
};
use statif_server::api::create_router;
use statif_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging is not installed yet when the configuration failed to load.
        let _ = tracing_subscriber::fmt().try_init();
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let (plain, structured) = if json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .init();
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("STATIF_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_logging(config.logging.json);
    info!(version = VERSION, "Loaded configuration from {:?}", config_path);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    verify_paths(&config).context("Required paths are missing")?;
    info!("Database path: {:?}", config.database.path);
    info!("Archive repository: {:?}", config.paths.archive_repository);

    // Lock and status artifact
    let lock = Arc::new(
        FileLockManager::new(&config.paths.lock_file).context("Failed to open lock file")?,
    );
    if lock.is_locked().context("Failed to read lock file")? {
        warn!(
            "Lock file {:?} is held; clear it by hand if no operation is running",
            config.paths.lock_file
        );
    }
    let status = Arc::new(FileStatusStore::new(&config.paths.status_file));

    // External collaborators
    let connector = Arc::new(SqliteConnector::new(&config.database.path));
    let archiver = Arc::new(TarArchiver::new(
        &config.archive.tar_path,
        &config.paths.archive_repository,
    ));
    let deployer = Arc::new(ScriptDeployer::from_config(&config.deploy));
    let crawler = Arc::new(ProcessCrawler::new(config.crawler.clone(), &config.paths));

    // Lifecycle service and job worker
    let (lifecycle, worker) = create_lifecycle(
        config.paths.clone(),
        Collaborators {
            lock,
            status,
            connector,
            archiver,
            deployer,
            crawler,
        },
        config.executor.queue_capacity,
    )
    .context("Failed to initialize lifecycle store")?;
    let worker_handle = tokio::spawn(worker.run());

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::new(lifecycle)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and with it the job handle) is gone; the worker drains and exits.
    info!("Server shutting down...");
    let _ = worker_handle.await;
    info!("Job worker stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
