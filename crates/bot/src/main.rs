mod console;
mod delivery;
mod metrics;
mod render;
mod state;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comicrelay_core::{
    load_config, validate_config, ArtifactStore, CatalogProvider, ContentProvider,
    JobOrchestrator, SessionStore,
};

use console::{Console, Flow};
use delivery::Delivery;
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often expired selection sessions are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let json = std::env::var("COMICRELAY_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr; stdout carries the conversation.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run() -> Result<()> {
    init_tracing();
    info!(version = VERSION, "Starting comicrelay");

    // Determine config path
    let config_path = std::env::var("COMICRELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Download directory: {:?}", config.storage.download_dir);
    info!("Cleanup policy: {:?}", config.storage.cleanup_policy());

    let store = ArtifactStore::new(&config.storage.download_dir, config.storage.cleanup_policy());
    store
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create {:?}", config.storage.download_dir))?;

    let catalog_config = config
        .catalog
        .as_ref()
        .context("No [catalog] section configured; there is no content provider to serve")?;
    let provider: Arc<dyn ContentProvider> = Arc::new(
        CatalogProvider::open(&catalog_config.path, &config.storage.download_dir)
            .await
            .with_context(|| format!("Failed to open catalog {:?}", catalog_config.path))?,
    );

    let orchestrator = JobOrchestrator::new(config.jobs.clone(), provider, store)
        .context("Failed to create job orchestrator")?;
    let sessions = SessionStore::new(config.sessions.clone());

    let outbox_dir = config
        .storage
        .download_dir
        .parent()
        .map(|p| p.join("outbox"))
        .unwrap_or_else(|| PathBuf::from("outbox"));
    let delivery = Delivery::new(outbox_dir);
    info!("Outbox directory: {:?}", delivery.outbox_dir());

    let state = Arc::new(AppState::new(config, orchestrator, sessions, delivery));

    // Sweep expired sessions in the background
    let purge_handle = state.config().sessions.ttl().map(|_| {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                state.sessions().purge_expired().await;
            }
        })
    });

    // Print replies as they arrive
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            println!("{}", reply);
        }
    });

    let user_id = std::env::var("COMICRELAY_USER").unwrap_or_else(|_| "console".to_string());
    let group_id = std::env::var("COMICRELAY_GROUP").ok();
    if let Some(group_id) = &group_id {
        delivery::check_group_id(group_id).context("COMICRELAY_GROUP is not usable")?;
    }
    info!(user_id = %user_id, group_id = ?group_id, "Console ready (type /help)");

    let console = Console::new(Arc::clone(&state), user_id, group_id, reply_tx);
    read_loop(&console).await?;

    info!("Shutting down...");
    state.orchestrator().shutdown();
    console.drain().await;

    if let Some(handle) = purge_handle {
        handle.abort();
    }
    drop(console);
    let _ = printer.await;

    info!("Stopped");
    Ok(())
}

/// Reads stdin on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Feeds stdin lines to the console until EOF, `/quit` or a shutdown signal.
async fn read_loop(console: &Console) -> Result<()> {
    let mut lines = spawn_stdin_reader();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            line = lines.recv() => {
                let Some(line) = line else {
                    return Ok(());
                };
                let line = line.context("Failed to read from stdin")?;
                if console.handle_line(&line).await == Flow::Quit {
                    return Ok(());
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
