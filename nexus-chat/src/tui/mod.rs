// TUI: the NEXUS landing page with the chat widget floating on top.
//
// The TUI owns a `ViewState` holding the latest `WidgetView` snapshot. The
// app orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::chat::WidgetView;
use crate::protocol::{UiUpdate, UserCommand};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state for rendering.
pub struct ViewState {
    /// Latest snapshot of the chat widget.
    pub chat: WidgetView,
    /// Signed-in user's email, shown in the navbar.
    pub user_email: Option<String>,
    /// Chat message area scroll, in lines up from the bottom.
    pub chat_scroll: usize,
}

impl ViewState {
    pub fn new(chat: WidgetView, user_email: Option<String>) -> Self {
        ViewState {
            chat,
            user_email,
            chat_scroll: 0,
        }
    }
}

fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Widget(view) => {
            if view.scroll_to_bottom {
                state.chat_scroll = 0;
            }
            state.chat = *view;
        }
    }
}

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::navbar::render(frame, layout.navbar, state);
    widgets::hero::render(frame, layout.hero);
    widgets::features::render(frame, &layout.features);
    render_help_bar(frame, &layout, state);

    if state.chat.is_open {
        widgets::chat_panel::render(frame, layout.chat_panel, state);
        if let Some(alert) = &state.chat.alert {
            widgets::alert::render(frame, layout.chat_panel, alert);
        }
    } else {
        widgets::chat_button::render(frame, layout.chat_button, state);
        if let Some(alert) = &state.chat.alert {
            widgets::alert::render(frame, frame.area(), alert);
        }
    }
}

/// Hint text for the help bar.
fn help_text(state: &ViewState) -> &'static str {
    if state.chat.alert.is_some() {
        " Esc/Enter:Dismiss | Ctrl+C:Quit"
    } else if state.chat.is_open {
        " Enter:Send | Esc:Close chat | PgUp/PgDn:Scroll | Ctrl+U:Clear | Ctrl+C:Quit"
    } else {
        " c:Chat | q:Quit"
    }
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    mut view_state: ViewState,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = matches!(cmd, UserCommand::Quit);
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {
                        // Mouse, resize, focus: the next tick redraws.
                    }
                    Some(Err(e)) => break Err(anyhow::Error::from(e).context("terminal input failed")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::from(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
