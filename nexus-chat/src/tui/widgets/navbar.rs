// Navbar widget: brand, section links, signed-in user.

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

pub const LINKS: [&str; 3] = ["Features", "Ecosystem", "Roadmap"];

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [brand, links, account] = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Fill(1),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let brand_line = Line::from(vec![
        Span::styled(" ◆ ", Style::default().fg(Color::Magenta)),
        Span::styled(
            "NEXUS",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    frame.render_widget(Paragraph::new(brand_line), brand);

    frame.render_widget(
        Paragraph::new(Line::from(link_spans())).alignment(Alignment::Center),
        links,
    );

    frame.render_widget(
        Paragraph::new(Line::from(account_spans(state.user_email.as_deref())))
            .alignment(Alignment::Right),
        account,
    );
}

fn link_spans() -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, link) in LINKS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(*link, Style::default().fg(Color::Gray)));
    }
    spans
}

/// Signed-in email when there is a session, then Launch App. The session
/// comes from `config/session.toml`, so there is no sign-out control here.
pub fn account_spans(email: Option<&str>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    if let Some(email) = email {
        spans.push(Span::styled(
            email.to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        "[ Launch App ]",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" "));
    spans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::sample_state;
    use crate::tui::widgets::test_util::render_rows;

    #[test]
    fn account_without_session_only_offers_launch() {
        let spans = account_spans(None);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(!text.contains("Sign Out"));
        assert!(text.contains("Launch App"));
    }

    #[test]
    fn account_with_session_shows_email_without_sign_out() {
        let text: String = account_spans(Some("pilot@nexus.dev"))
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.starts_with("pilot@nexus.dev"));
        assert!(!text.contains("Sign Out"));
    }

    #[test]
    fn render_shows_brand_links_and_email() {
        let state = sample_state();
        let rows = render_rows(120, 3, |frame| render(frame, frame.area(), &state));
        assert!(rows[0].contains("NEXUS"));
        assert!(rows[0].contains("Ecosystem"));
        assert!(rows[0].contains("pilot@nexus.dev"));
    }
}
