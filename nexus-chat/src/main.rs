// NEXUS terminal client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Create mpsc channels
// 4. Open the chat channel on the configured backend
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use nexus_chat::app;
use nexus_chat::chat::{backend_for, ChatWidget};
use nexus_chat::config;
use nexus_chat::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("NEXUS client starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let url = config.server_url();
    info!(
        "Config loaded: backend={:?}, server={}, signed in as {}",
        config.widget.backend,
        url,
        config.session.email.as_deref().unwrap_or("<nobody>")
    );

    // 3. Create mpsc channels
    let (backend_tx, backend_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 4. Open the chat channel. A failure shows up in the widget; the landing
    //    page still runs.
    let widget = ChatWidget::new(config.widget.backend, config.session.user_id.clone());
    let mut app_state = app::AppState::new(widget);
    let initial_view = app_state.widget.view();
    let backend = backend_for(config.widget.backend, &url);
    app_state.connect(backend.as_ref(), backend_tx).await;

    // 5. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(backend_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Run the TUI event loop (blocking until user quits)
    info!("Application ready");
    let view_state = tui::ViewState::new(initial_view, config.session.email.clone());
    if let Err(e) = tui::run(ui_rx, cmd_tx, view_state).await {
        error!("TUI error: {:#}", e);
    }

    // 7. Cleanup: wait for the app task to close the channel (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("NEXUS client shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("nexus.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nexus_chat=info,nexus=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
