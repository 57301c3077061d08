use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatterm_backend::{LoopbackBackend, LoopbackConfig};
use chatterm_client::{terminal, ClientConfig, SessionManager, TerminalUi, UiHandler};
use chatterm_shared::constants::COMMAND_CHANNEL_CAPACITY;
use chatterm_shared::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration and tracing (stdout belongs to the UI)
    // -----------------------------------------------------------------------
    let config = ClientConfig::from_env();
    init_tracing(&config)?;

    info!("Starting chatterm v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 2. Subsystems
    // -----------------------------------------------------------------------
    let store = Arc::new(config.open_store().context("opening message store")?);

    // No companion device to confirm on, so the loopback pairs by itself.
    let backend = Arc::new(LoopbackBackend::new(
        LoopbackConfig::new(config.session_path()).auto_pair(true),
    ));

    let (ui, render) = TerminalUi::spawn(&config);
    let ui: Arc<dyn UiHandler> = Arc::new(ui);

    // -----------------------------------------------------------------------
    // 3. Session loop
    // -----------------------------------------------------------------------
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let session = SessionManager::new(&config, store, backend, Arc::clone(&ui), cmd_rx);

    cmd_tx
        .send(Command::new("login", Vec::<String>::new()))
        .await
        .context("queueing login")?;
    terminal::spawn_input_thread(config.cmd_prefix.clone(), cmd_tx, Arc::clone(&ui))
        .context("starting input thread")?;

    session.run().await;

    // Let the render task flush what is queued.
    drop(ui);
    let _ = tokio::time::timeout(Duration::from_secs(1), render).await;

    info!("chatterm stopped");
    Ok(())
}

fn init_tracing(config: &ClientConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chatterm_client=debug,chatterm_store=info,chatterm_backend=info,warn")
    });

    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
