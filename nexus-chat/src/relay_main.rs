// NEXUS relay entry point: the WebSocket server the chat widget talks to.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config
// 3. Open the message store
// 4. Bind the listener and serve until Ctrl+C

use std::sync::Arc;

use nexus_chat::config;
use nexus_chat::store::MessageStore;
use nexus_chat::ws_server::{self, Hub, Listener};

use anyhow::Context;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 3. Open the message store
    let store_path = config::resolve_store_path(&config.store)
        .context("failed to resolve message store path")?;
    let store = MessageStore::open(&store_path.to_string_lossy())
        .with_context(|| format!("failed to open message store at {}", store_path.display()))?;
    info!(
        "Message store opened at {} ({} messages)",
        store_path.display(),
        store.count()?
    );

    // 4. Serve
    let hub = Arc::new(Hub::new(Arc::new(store), config.history_limit()));
    let addr = config.bind_addr();
    let listener = Listener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind relay on {addr}"))?;

    tokio::select! {
        result = ws_server::run(listener, hub) => {
            if let Err(e) = result {
                error!("Relay server error: {:#}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    info!("Relay shut down cleanly");
    Ok(())
}

/// The relay has no TUI; log to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nexus_chat=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
