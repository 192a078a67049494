// Hero section: release badge, headline, tagline and calls to action.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

pub const BADGE: &str = "v2.0 Protocol Live";
pub const HEADLINE: (&str, &str) = ("The Future of ", "Digital Reality");
pub const TAGLINE: &str = "Enter the next generation of decentralized infrastructure. \
    Built for speed, scaled for infinity, and designed for the pioneers of tomorrow.";

pub fn render(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::raw(""),
        Line::from(vec![
            Span::styled("● ", Style::default().fg(Color::Green)),
            Span::styled(BADGE, Style::default().fg(Color::Cyan)),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled(
                HEADLINE.0,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                HEADLINE.1,
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::raw(""),
        Line::styled(TAGLINE, Style::default().fg(Color::Gray)),
        Line::raw(""),
        Line::from(vec![
            Span::styled(
                "[ Get Started > ]",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled("[ View Documentation ]", Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
