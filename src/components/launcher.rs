// ABOUTME: Launcher screen with the session identifier input, runtime selector and start trigger

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::AppState;
use crate::launcher::state::{PITCH, TITLE};
use crate::models::RuntimeKind;

/// Renders the session launcher form
pub struct LauncherComponent;

impl LauncherComponent {
    /// Stateless component
    pub fn new() -> Self {
        Self
    }

    /// Draw the form centered in `area`
    pub fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = Self::centered_rect(70, 80, area);
        frame.render_widget(Clear, popup_area);

        let launcher = &state.launcher;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Pitch
                Constraint::Length(3), // Identifier input
                Constraint::Length(3), // Runtime selector
                Constraint::Length(3), // Trigger
                Constraint::Min(0),    // Error
                Constraint::Length(3), // Instructions
            ])
            .split(popup_area);

        let title = Paragraph::new(TITLE)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        frame.render_widget(title, chunks[0]);

        let pitch = Paragraph::new(PITCH)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(pitch, chunks[1]);

        let input_style = if launcher.is_loading() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let identifier = Paragraph::new(format!("{}▏", launcher.identifier))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green))
                    .title("Repl ID"),
            )
            .style(input_style);
        frame.render_widget(identifier, chunks[2]);

        frame.render_widget(Self::runtime_selector(launcher.runtime), chunks[3]);

        let trigger_style = if launcher.is_loading() {
            Style::default().fg(Color::Gray).bg(Color::DarkGray)
        } else {
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        };
        let trigger = Paragraph::new(launcher.trigger_label())
            .block(Block::default().borders(Borders::ALL))
            .style(trigger_style)
            .alignment(Alignment::Center);
        frame.render_widget(trigger, chunks[4]);

        if let Some(error) = launcher.last_error() {
            let error = Paragraph::new(format!("✗ {}", error))
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(error, chunks[5]);
        }

        let instructions = Paragraph::new(
            "Type to edit • Tab/←/→: Runtime • Enter: Start • Esc: Quit",
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray)),
        )
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
        frame.render_widget(instructions, chunks[6]);
    }

    fn runtime_selector(selected: RuntimeKind) -> Paragraph<'static> {
        let mut spans = Vec::new();
        for runtime in RuntimeKind::ALL {
            let (marker, style) = if runtime == selected {
                (
                    "◉",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )
            } else {
                ("○", Style::default().fg(Color::White))
            };
            spans.push(Span::styled(format!(" {} {} ", marker, runtime.label()), style));
            spans.push(Span::raw("  "));
        }

        Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green))
                    .title("Language"),
            )
            .alignment(Alignment::Center)
    }

    fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(area);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

impl Default for LauncherComponent {
    fn default() -> Self {
        Self::new()
    }
}
