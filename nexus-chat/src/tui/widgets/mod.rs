// TUI widget modules for each screen zone.

pub mod alert;
pub mod chat_button;
pub mod chat_panel;
pub mod features;
pub mod hero;
pub mod navbar;

#[cfg(test)]
pub(crate) mod test_util {
    use ratatui::backend::TestBackend;
    use ratatui::{Frame, Terminal};

    /// Draw with `draw` on a `width` x `height` test terminal and return the
    /// buffer rows as strings.
    pub fn render_rows(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(draw).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| (0..width).map(|x| buffer[(x, y)].symbol()).collect::<String>())
            .collect()
    }
}
