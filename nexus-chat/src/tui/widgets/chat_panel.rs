// Chat panel: "NEXUS COMM" header, grouped message area, input line.
//
// Own messages are right-aligned, others left-aligned with a sender label on
// the first message of each run. Pending echoes are dimmed until confirmed.

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::chat::{EntryView, WidgetView};
use crate::protocol::ConnectionStatus;
use crate::tui::ViewState;

pub const TITLE: &str = "NEXUS COMM";
pub const PLACEHOLDER: &str = "Transmit message...";

/// Share of the message area a bubble may take.
const BUBBLE_WIDTH_PERCENT: usize = 80;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let view = &state.chat;
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {TITLE} "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" Esc ").right_aligned());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [header, messages, input] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(Paragraph::new(header_line(view)), header);

    let lines = message_lines(view, messages.width as usize);
    let visible = visible_lines(lines, messages.height as usize, state.chat_scroll);
    frame.render_widget(Paragraph::new(visible), messages);

    frame.render_widget(Paragraph::new(input_line(view)), input);
}

/// Connection dot plus the backend subtitle.
pub fn header_line(view: &WidgetView) -> Line<'static> {
    let (dot, color) = connection_indicator(view.connection);
    Line::from(vec![
        Span::styled(format!("{dot} "), Style::default().fg(color)),
        Span::styled(view.subtitle(), Style::default().fg(Color::Gray)),
    ])
}

pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connecting => ("●", Color::Yellow),
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Red),
    }
}

/// All lines of the message area, top to bottom, for a `width` wide area.
pub fn message_lines(view: &WidgetView, width: usize) -> Vec<Line<'static>> {
    if view.entries.is_empty() {
        let (first, second) = view.empty_copy();
        return vec![
            Line::raw(""),
            Line::styled(first, Style::default().fg(Color::DarkGray)).centered(),
            Line::styled(second, Style::default().fg(Color::DarkGray)).centered(),
        ];
    }

    let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100).max(1);
    let mut lines = Vec::new();
    for entry in &view.entries {
        lines.extend(entry_lines(entry, bubble_width));
    }
    lines
}

fn entry_lines(entry: &EntryView, bubble_width: usize) -> Vec<Line<'static>> {
    let alignment = if entry.is_mine {
        Alignment::Right
    } else {
        Alignment::Left
    };

    let mut bubble = if entry.is_mine {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    };
    if entry.pending {
        bubble = bubble.add_modifier(Modifier::DIM | Modifier::ITALIC);
    }

    let mut lines = Vec::new();
    if let Some(label) = &entry.sender_label {
        lines.push(
            Line::styled(label.clone(), Style::default().fg(Color::Magenta))
                .alignment(alignment),
        );
    }
    for chunk in wrap_text(&entry.text, bubble_width) {
        lines.push(Line::styled(chunk, bubble).alignment(alignment));
    }
    let stamp = if entry.pending {
        format!("{} ...", entry.time_label)
    } else {
        entry.time_label.clone()
    };
    lines.push(Line::styled(stamp, Style::default().fg(Color::DarkGray)).alignment(alignment));
    lines
}

/// The window of `lines` to show in `height` rows, `scroll` lines up from
/// the bottom. Scroll is clamped to the top.
pub fn visible_lines(lines: Vec<Line<'static>>, height: usize, scroll: usize) -> Vec<Line<'static>> {
    let total = lines.len();
    let max_scroll = total.saturating_sub(height);
    let scroll = scroll.min(max_scroll);
    let end = total - scroll;
    let start = end.saturating_sub(height);
    lines.into_iter().skip(start).take(end - start).collect()
}

fn input_line(view: &WidgetView) -> Line<'static> {
    let prompt = Span::styled("> ", Style::default().fg(Color::Cyan));
    let send_style = if view.can_submit {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let body = if view.input.is_empty() {
        Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(format!("{}▏", view.input), Style::default().fg(Color::White))
    };
    Line::from(vec![prompt, body, Span::raw("  "), Span::styled("⏎", send_style)])
}

/// Break `text` into lines of at most `width` characters, preferring word
/// boundaries. Embedded newlines are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let word_len = word.chars().count();
            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word_len <= width {
                current.push(' ');
                current.push_str(word);
                continue;
            }
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
            }
            // Hard-split words longer than a line.
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                out.push(chars.drain(..width).collect());
            }
            current = chars.into_iter().collect();
        }
        out.push(current);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
