// Alert overlay: a centered modal showing a backend failure.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

const DIALOG_WIDTH: u16 = 40;

/// Render `text` (possibly multi-line) centered in `area`.
pub fn render(frame: &mut Frame, area: Rect, text: &str) {
    let mut lines: Vec<Line> = text
        .lines()
        .map(|l| Line::styled(l.to_string(), Style::default().fg(Color::White)))
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Esc to dismiss",
        Style::default().fg(Color::DarkGray),
    ));

    let inner_width = DIALOG_WIDTH.min(area.width).saturating_sub(2).max(1) as usize;
    let body_rows: usize = lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(inner_width))
        .sum();
    let height = (body_rows as u16).saturating_add(2);
    let dialog_area = centered_rect(DIALOG_WIDTH, height, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Alert ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Compute a centered rectangle of the given size within `area`, clamped to
/// the available space.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);

    let horizontal = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0]);

    horizontal[0]
}
