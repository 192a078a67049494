// Screen layout: landing page zones plus the floating chat overlay.
//
// +--------------------------------------------------+
// | Navbar (3 rows)                                   |
// +--------------------------------------------------+
// | Hero (fill)                                       |
// |                                                   |
// +----------------+----------------+----------------+
// | Feature card   | Feature card   | Feature card   |
// +----------------+----------------+----------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// The chat panel and the chat button float over the bottom-right corner,
// just above the help bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Preferred chat panel size; clamped to the terminal.
pub const CHAT_PANEL_WIDTH: u16 = 46;
pub const CHAT_PANEL_HEIGHT: u16 = 22;

/// Chat button size.
pub const CHAT_BUTTON_WIDTH: u16 = 16;
pub const CHAT_BUTTON_HEIGHT: u16 = 3;

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top: brand, links, signed-in user.
    pub navbar: Rect,
    /// Headline, tagline and calls to action.
    pub hero: Rect,
    /// Three feature cards, left to right.
    pub features: [Rect; 3],
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
    /// Overlay: the open chat panel, bottom right.
    pub chat_panel: Rect,
    /// Overlay: the floating chat button, bottom right.
    pub chat_button: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: navbar(3) | hero(fill) | features(7) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // navbar
            Constraint::Min(8),    // hero
            Constraint::Length(7), // feature cards
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let navbar = vertical[0];
    let hero = vertical[1];
    let help_bar = vertical[3];

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(vertical[2]);

    // Everything above the help bar is available to the overlays.
    let overlay_area = Rect {
        height: area.height.saturating_sub(help_bar.height),
        ..area
    };

    AppLayout {
        navbar,
        hero,
        features: [cards[0], cards[1], cards[2]],
        help_bar,
        chat_panel: bottom_right(CHAT_PANEL_WIDTH, CHAT_PANEL_HEIGHT, overlay_area, 1),
        chat_button: bottom_right(CHAT_BUTTON_WIDTH, CHAT_BUTTON_HEIGHT, overlay_area, 1),
    }
}

/// A `width` x `height` rect in the bottom-right corner of `area`, inset by
/// `margin` cells, clamped to fit.
fn bottom_right(width: u16, height: u16, area: Rect, margin: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(margin));
    let height = height.min(area.height.saturating_sub(margin));
    Rect {
        x: area.x + area.width.saturating_sub(width + margin),
        y: area.y + area.height.saturating_sub(height + margin),
        width,
        height,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        let rects = [
            ("navbar", layout.navbar),
            ("hero", layout.hero),
            ("feature 0", layout.features[0]),
            ("feature 1", layout.features[1]),
            ("feature 2", layout.features[2]),
            ("help_bar", layout.help_bar),
            ("chat_panel", layout.chat_panel),
            ("chat_button", layout.chat_button),
        ];
        for (name, rect) in rects {
            assert!(rect.width > 0, "{name} has zero width");
            assert!(rect.height > 0, "{name} has zero height");
        }
    }

    #[test]
    fn help_bar_is_last_row() {
        let layout = build_layout(test_area());
        assert_eq!(layout.help_bar.y, 39);
        assert_eq!(layout.help_bar.height, 1);
    }

    #[test]
    fn chat_panel_anchored_bottom_right_above_help_bar() {
        let layout = build_layout(test_area());
        let panel = layout.chat_panel;
        assert_eq!(panel.width, CHAT_PANEL_WIDTH);
        assert_eq!(panel.height, CHAT_PANEL_HEIGHT);
        assert_eq!(panel.x + panel.width, 119);
        assert!(panel.y + panel.height <= layout.help_bar.y);
    }

    #[test]
    fn chat_button_shares_corner_with_panel() {
        let layout = build_layout(test_area());
        let right = |r: Rect| r.x + r.width;
        let bottom = |r: Rect| r.y + r.height;
        assert_eq!(right(layout.chat_button), right(layout.chat_panel));
        assert_eq!(bottom(layout.chat_button), bottom(layout.chat_panel));
    }

    #[test]
    fn overlays_clamp_to_small_terminal() {
        let area = Rect::new(0, 0, 30, 12);
        let layout = build_layout(area);
        assert!(layout.chat_panel.width <= area.width);
        assert!(layout.chat_panel.y + layout.chat_panel.height <= area.height);
    }

    #[test]
    fn feature_cards_split_evenly() {
        let layout = build_layout(test_area());
        assert_eq!(layout.features[0].width, 40);
        assert_eq!(layout.features[1].width, 40);
        assert_eq!(layout.features[2].width, 40);
        assert_eq!(layout.features[1].x, 40);
    }
}
