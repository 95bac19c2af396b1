// ABOUTME: Terminal emulator widget for rendering shell output in the TUI
// Processes ANSI escape codes through vt100 and draws the screen with ratatui

use crate::terminal::surface::{SurfaceOptions, SurfaceSize, TerminalSurface};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Widget},
};
use tracing::trace;

/// Terminal emulator widget for rendering remote shell output
pub struct TerminalEmulatorWidget {
    /// VT100 parser for processing ANSI escape codes
    parser: vt100::Parser,

    options: SurfaceOptions,

    /// Set once the widget has been fitted to its container
    mounted: bool,

    /// Title for the terminal block
    title: String,

    /// Border style based on focus state
    border_style: Style,
}

impl TerminalEmulatorWidget {
    /// Unmounted widget sized from `options`
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            parser: vt100::Parser::new(options.rows, options.cols, options.scrollback),
            options,
            mounted: false,
            title: String::from("Terminal"),
            border_style: Style::default().fg(Color::Gray),
        }
    }

    /// Feed shell output to the parser
    pub fn process_output(&mut self, data: &str) {
        trace!("Terminal emulator processing {} bytes of output", data.len());
        self.parser.process(data.as_bytes());
        // New output snaps the view back to the live screen
        self.parser.set_scrollback(0);
    }

    /// Current screen as plain text, rows joined by newlines
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    /// Current screen size
    pub fn size(&self) -> SurfaceSize {
        let (rows, cols) = self.parser.screen().size();
        SurfaceSize::new(cols, rows)
    }

    /// Whether `mount` has run
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Construction options
    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    /// Scroll up by n lines
    pub fn scroll_up(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser.set_scrollback(offset.saturating_add(n));
    }

    /// Scroll down by n lines
    pub fn scroll_down(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser.set_scrollback(offset.saturating_sub(n));
    }

    /// Lines scrolled back from the live screen
    pub fn scroll_offset(&self) -> usize {
        self.parser.screen().scrollback()
    }

    /// Check if at bottom
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_offset() == 0
    }

    /// Border title
    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Set border style based on focus
    pub fn set_focused(&mut self, focused: bool) {
        self.border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
    }

    /// Convert VT100 screen to ratatui Text
    fn screen_to_text(&self) -> Text<'static> {
        let screen = self.parser.screen();
        let base = Style::default().bg(self.options.background);
        let (rows, cols) = screen.size();
        let mut lines = Vec::with_capacity(rows as usize);

        for row in 0..rows {
            let mut spans = Vec::new();
            let mut current_style = base;
            let mut current_text = String::new();

            for col in 0..cols {
                let (cell_style, contents) = match screen.cell(row, col) {
                    Some(cell) if cell.is_wide_continuation() => continue,
                    Some(cell) if cell.has_contents() => {
                        (Self::cell_to_style(cell, base), cell.contents())
                    }
                    Some(cell) => (Self::cell_to_style(cell, base), " ".to_string()),
                    None => (base, " ".to_string()),
                };

                // If style changed, push current span and start new one
                if cell_style != current_style && !current_text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut current_text), current_style));
                }
                current_style = cell_style;
                current_text.push_str(&contents);
            }

            if !current_text.is_empty() {
                spans.push(Span::styled(current_text, current_style));
            }
            lines.push(Line::from(spans));
        }

        Text::from(lines)
    }

    /// Convert VT100 cell attributes to ratatui Style
    fn cell_to_style(cell: &vt100::Cell, base: Style) -> Style {
        let mut style = base;

        style = match cell.fgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.fg(Self::ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.fg(Color::Rgb(r, g, b)),
        };

        style = match cell.bgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.bg(Self::ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.bg(Color::Rgb(r, g, b)),
        };

        if cell.bold() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if cell.italic() {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if cell.underline() {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if cell.inverse() {
            style = style.add_modifier(Modifier::REVERSED);
        }

        style
    }

    /// Convert ANSI color index to ratatui Color
    fn ansi_to_ratatui_color(idx: u8) -> Color {
        match idx {
            0 => Color::Black,
            1 => Color::Red,
            2 => Color::Green,
            3 => Color::Yellow,
            4 => Color::Blue,
            5 => Color::Magenta,
            6 => Color::Cyan,
            7 => Color::Gray,
            8 => Color::DarkGray,
            9 => Color::LightRed,
            10 => Color::LightGreen,
            11 => Color::LightYellow,
            12 => Color::LightBlue,
            13 => Color::LightMagenta,
            14 => Color::LightCyan,
            15 => Color::White,
            n => Color::Indexed(n),
        }
    }

    fn cursor_style(&self) -> Style {
        let style = Style::default().add_modifier(Modifier::REVERSED);
        if self.options.cursor_blink {
            style.add_modifier(Modifier::SLOW_BLINK)
        } else {
            style
        }
    }
}

impl TerminalSurface for TerminalEmulatorWidget {
    fn mount(&mut self, size: SurfaceSize) {
        if self.mounted {
            return;
        }
        let cols = size.cols.max(1);
        let rows = size.rows.max(1);
        self.parser.set_size(rows, cols);
        self.mounted = true;
        trace!("Terminal surface fitted to {}x{}", cols, rows);
    }

    fn write(&mut self, data: &str) {
        self.process_output(data);
    }

    fn dispose(&mut self) {
        self.parser = vt100::Parser::new(self.options.rows, self.options.cols, 0);
        self.mounted = false;
    }
}

impl Widget for &TerminalEmulatorWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(self.border_style)
            .style(Style::default().bg(self.options.background));

        let inner = block.inner(area);
        block.render(area, buf);

        // No wrapping: the emulator already laid out its rows
        Paragraph::new(self.screen_to_text()).render(inner, buf);

        let screen = self.parser.screen();
        if !screen.hide_cursor() && self.is_at_bottom() && inner.width > 0 && inner.height > 0 {
            let (cursor_row, cursor_col) = screen.cursor_position();
            let cursor_x = inner.left() + cursor_col.min(inner.width - 1);
            let cursor_y = inner.top() + cursor_row.min(inner.height - 1);
            buf.get_mut(cursor_x, cursor_y).set_style(self.cursor_style());
        }

        if !self.is_at_bottom() && area.width > 4 {
            let indicator = format!(" ▲ {} lines above ", self.scroll_offset());
            buf.set_stringn(
                area.left() + 2,
                area.top(),
                indicator,
                (area.width - 4) as usize,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            );
        }
    }
}
