// ABOUTME: Coding view: the attached terminal surface plus a one-line connection status bar

use ratatui::{
    prelude::*,
    style::{Color, Style},
    widgets::Paragraph,
};

use crate::app::{AppState, CodingSession};
use crate::terminal::{ConnectionState, SurfaceSize};

/// Terminal surface size for a given screen: full width and height minus the
/// status bar and the surface borders
pub fn surface_size(viewport: SurfaceSize) -> SurfaceSize {
    SurfaceSize::new(
        viewport.cols.saturating_sub(2).max(1),
        viewport.rows.saturating_sub(3).max(1),
    )
}

/// Renders the attached terminal and its status bar
pub struct CodingComponent;

impl CodingComponent {
    /// Stateless component
    pub fn new() -> Self {
        Self
    }

    /// Draw the session, or a placeholder when there is none
    pub fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let Some(coding) = state.coding.as_ref() else {
            let empty = Paragraph::new("No coding session").style(Style::default().fg(Color::Gray));
            frame.render_widget(empty, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // Terminal
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        if let Some(surface) = coding.bridge.surface() {
            frame.render_widget(surface, chunks[0]);
        }

        frame.render_widget(Self::status_bar(coding), chunks[1]);
    }

    fn status_bar(coding: &CodingSession) -> Paragraph<'static> {
        let connection = coding.connection();
        let status = connection.status();
        let (indicator, label, color) = match (coding.bridge.connection_lost(), status.state) {
            (Some(reason), _) => ("✗", format!("Disconnected: {}", reason), Color::Red),
            (None, _) if connection.is_connected() => {
                ("●", "Connected".to_string(), Color::Green)
            }
            (None, ConnectionState::Connecting) => ("◌", "Connecting".to_string(), Color::Yellow),
            (None, _) => (
                "✗",
                status
                    .last_error
                    .map_or_else(|| "Disconnected".to_string(), |e| format!("Disconnected: {}", e)),
                Color::Red,
            ),
        };

        Paragraph::new(Line::from(vec![
            Span::styled(format!(" {} {} ", indicator, label), Style::default().fg(color)),
            Span::styled(
                format!("│ {} ", coding.route),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                "│ Ctrl+Q: Leave • Shift+PgUp/PgDn: Scroll",
                Style::default().fg(Color::Gray),
            ),
        ]))
    }
}

impl Default for CodingComponent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_accounts_for_chrome() {
        assert_eq!(surface_size(SurfaceSize::new(100, 30)), SurfaceSize::new(98, 27));
        assert_eq!(surface_size(SurfaceSize::new(1, 1)), SurfaceSize::new(1, 1));
    }
}
