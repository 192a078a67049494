// Application state and orchestration logic.
//
// The event loop that connects the chat widget to its backend channel and to
// the TUI. Backend events and user commands mutate the `ChatWidget`; after
// each change a fresh `WidgetView` is pushed to the render loop.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChannelHandle, ChatBackend, ChatWidget};
use crate::protocol::{BackendError, BackendEvent, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub widget: ChatWidget,
    /// The open backend channel. `None` until connected, or after the
    /// connection attempt failed.
    pub handle: Option<ChannelHandle>,
}

impl AppState {
    pub fn new(widget: ChatWidget) -> Self {
        AppState {
            widget,
            handle: None,
        }
    }

    /// Open the widget's channel on `backend`. A failed connection is shown
    /// in the widget as an alert; the app keeps running without a channel.
    pub async fn connect(&mut self, backend: &dyn ChatBackend, events: mpsc::Sender<BackendEvent>) {
        match backend.open(events).await {
            Ok(handle) => {
                self.handle = Some(handle);
            }
            Err(e) => {
                warn!("Could not open {:?} channel: {e}", backend.kind());
                self.widget.apply(BackendEvent::Disconnected);
                self.widget.apply(BackendEvent::Error(BackendError::from(&e)));
            }
        }
    }

    /// Submit the input line, if the widget lets it go.
    async fn submit(&mut self) {
        let Some(outgoing) = self.widget.submit() else {
            return;
        };
        let local = outgoing.local();
        let result = match &self.handle {
            Some(handle) => handle.send(outgoing).await,
            None => Err(crate::chat::backend::ChannelError::Closed),
        };
        if let Err(e) = result {
            self.widget.apply(BackendEvent::SendFailed {
                local,
                error: BackendError::from(&e),
            });
        }
    }

    /// Disconnect the channel, if any.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!("Closing chat channel");
            handle.close().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. Backend events from the channel driver
/// 2. User commands from the TUI
///
/// Pushes a `WidgetView` through `ui_tx` after every change. Returns after
/// `Quit` (or when the TUI goes away), with the channel closed.
pub async fn run(
    mut backend_rx: mpsc::Receiver<BackendEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    // The driver drops its sender when the connection ends; stop polling then
    // so tokio::select! never spins on a closed channel.
    let mut backend_open = true;

    push_view(&mut state, &ui_tx).await;

    loop {
        tokio::select! {
            // --- Backend events ---
            event = backend_rx.recv(), if backend_open => {
                match event {
                    Some(event) => {
                        debug!("Backend event: {event:?}");
                        state.widget.apply(event);
                    }
                    None => {
                        info!("Backend channel closed");
                        backend_open = false;
                        continue;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }

        push_view(&mut state, &ui_tx).await;
    }

    state.shutdown().await;
    info!("Application event loop exited");
    Ok(())
}

async fn push_view(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let view = state.widget.view();
    let _ = ui_tx.send(UiUpdate::Widget(Box::new(view))).await;
}

/// Handle a user command from the TUI.
async fn handle_user_command(state: &mut AppState, cmd: UserCommand) {
    match cmd {
        UserCommand::InputChar(c) => state.widget.push_char(c),
        UserCommand::Backspace => state.widget.backspace(),
        UserCommand::ClearInput => state.widget.clear_input(),
        UserCommand::Submit => state.submit().await,
        UserCommand::ToggleChat => {
            state.widget.toggle();
            debug!("Chat panel open: {}", state.widget.is_open);
        }
        UserCommand::CloseChat => state.widget.close(),
        UserCommand::DismissAlert => state.widget.dismiss_alert(),
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::backend::ChannelError;
    use crate::chat::WidgetView;
    use crate::message::RelayMessage;
    use crate::protocol::{BackendKind, ConnectionStatus};
    use async_trait::async_trait;

    /// A backend that can never be reached.
    struct Unreachable;

    #[async_trait]
    impl ChatBackend for Unreachable {
        fn kind(&self) -> BackendKind {
            BackendKind::Relay
        }

        async fn open(
            &self,
            _events: mpsc::Sender<BackendEvent>,
        ) -> Result<ChannelHandle, ChannelError> {
            Err(ChannelError::Closed)
        }
    }

    async fn next_view(ui_rx: &mut mpsc::Receiver<UiUpdate>) -> WidgetView {
        match ui_rx.recv().await.expect("ui channel open") {
            UiUpdate::Widget(view) => *view,
        }
    }

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let state = AppState::new(ChatWidget::new(BackendKind::Relay, None));
        let (_ev_tx, ev_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, _ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(ev_rx, cmd_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Quit).await.unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn event_loop_exits_when_commands_close() {
        let state = AppState::new(ChatWidget::new(BackendKind::Relay, None));
        let (_ev_tx, ev_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, _ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(ev_rx, cmd_rx, ui_tx, state));
        drop(cmd_tx);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn initial_view_is_closed_and_connecting() {
        let state = AppState::new(ChatWidget::new(BackendKind::Table, None));
        let (_ev_tx, ev_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(ev_rx, cmd_rx, ui_tx, state));
        let view = next_view(&mut ui_rx).await;
        assert!(!view.is_open);
        assert_eq!(view.connection, ConnectionStatus::Connecting);
        assert_eq!(view.backend, BackendKind::Table);

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn backend_events_reach_the_view() {
        let state = AppState::new(ChatWidget::new(BackendKind::Relay, None));
        let (ev_tx, ev_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(ev_rx, cmd_rx, ui_tx, state));
        next_view(&mut ui_rx).await;

        ev_tx
            .send(BackendEvent::Connected {
                sid: Some("sock-a".into()),
            })
            .await
            .unwrap();
        let view = next_view(&mut ui_rx).await;
        assert_eq!(view.connection, ConnectionStatus::Connected);

        ev_tx
            .send(BackendEvent::Message(
                RelayMessage::compose("hello there", "sock-b").into(),
            ))
            .await
            .unwrap();
        let view = next_view(&mut ui_rx).await;
        assert_eq!(view.entries.len(), 1);
        assert!(view.unread);

        cmd_tx.send(UserCommand::ToggleChat).await.unwrap();
        let view = next_view(&mut ui_rx).await;
        assert!(view.is_open);
        assert!(!view.unread);
        assert!(view.scroll_to_bottom);

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn typing_updates_input_line() {
        let state = AppState::new(ChatWidget::new(BackendKind::Relay, None));
        let (_ev_tx, ev_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(ev_rx, cmd_rx, ui_tx, state));
        next_view(&mut ui_rx).await;

        for c in "hey".chars() {
            cmd_tx.send(UserCommand::InputChar(c)).await.unwrap();
        }
        cmd_tx.send(UserCommand::Backspace).await.unwrap();
        let mut view = next_view(&mut ui_rx).await;
        for _ in 0..3 {
            view = next_view(&mut ui_rx).await;
        }
        assert_eq!(view.input, "he");

        cmd_tx.send(UserCommand::ClearInput).await.unwrap();
        assert_eq!(next_view(&mut ui_rx).await.input, "");

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_connect_raises_alert() {
        let mut state = AppState::new(ChatWidget::new(BackendKind::Relay, None));
        let (ev_tx, _ev_rx) = mpsc::channel(16);
        state.connect(&Unreachable, ev_tx).await;

        assert!(state.handle.is_none());
        assert_eq!(state.widget.connection, ConnectionStatus::Disconnected);
        let alert = state.widget.alert.clone().expect("alert raised");
        assert!(alert.starts_with("Failed: channel is closed"));
    }

    #[tokio::test]
    async fn submit_without_channel_discards_echo() {
        let mut state = AppState::new(ChatWidget::new(BackendKind::Table, Some("user-1".into())));
        for c in "lost".chars() {
            state.widget.push_char(c);
        }
        state.submit().await;

        assert!(state.widget.feed.is_empty());
        assert!(state.widget.input.is_empty());
        assert!(state.widget.alert.is_some());
    }
}
