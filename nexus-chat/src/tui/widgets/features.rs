// Feature cards: three bordered panels under the hero.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub struct Feature {
    pub icon: &'static str,
    pub title: &'static str,
    pub desc: &'static str,
}

pub const FEATURES: [Feature; 3] = [
    Feature {
        icon: "⚡",
        title: "Quantum Speed",
        desc: "Execute transactions at the speed of light with our optimized rollup architecture.",
    },
    Feature {
        icon: "⛨",
        title: "Titanium Security",
        desc: "Military-grade cryptography keeping your localized assets invulnerable and private.",
    },
    Feature {
        icon: "➚",
        title: "Boundless Scale",
        desc: "Infinite horizontal scaling that adapts seamlessly to your ecosystem demands.",
    },
];

pub fn render(frame: &mut Frame, areas: &[Rect; 3]) {
    for (feature, area) in FEATURES.iter().zip(areas) {
        render_card(frame, *area, feature);
    }
}

fn render_card(frame: &mut Frame, area: Rect, feature: &Feature) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(vec![
            Span::styled(format!(" {} ", feature.icon), Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("{} ", feature.title),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));

    let paragraph = Paragraph::new(feature.desc)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::layout::build_layout;
    use crate::tui::widgets::test_util::render_rows;

    #[test]
    fn all_three_titles_render() {
        let rows = render_rows(120, 40, |frame| {
            let layout = build_layout(frame.area());
            render(frame, &layout.features);
        });
        let screen = rows.join("\n");
        for feature in &FEATURES {
            assert!(screen.contains(feature.title), "{} missing", feature.title);
        }
    }
}
