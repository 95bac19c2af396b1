// ABOUTME: Terminal surface seam between the bridge and whatever renders shell output

use ratatui::style::Color;

/// Fixed emulator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Columns
    pub cols: u16,
    /// Rows
    pub rows: u16,
    /// Whether the cursor blinks
    pub cursor_blink: bool,
    /// Background color
    pub background: Color,
    /// Lines of history kept
    pub scrollback: usize,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            cols: 200,
            rows: 24,
            cursor_blink: true,
            background: Color::Black,
            scrollback: 10_000,
        }
    }
}

/// Size of the container a surface is mounted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    /// Columns
    pub cols: u16,
    /// Rows
    pub rows: u16,
}

impl SurfaceSize {
    /// Size of `cols` by `rows`
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

/// Something the bridge can render shell output into. Each bridge owns
/// exactly one surface for its whole attached lifetime.
pub trait TerminalSurface {
    /// Fit to the container. Called once, on attach.
    fn mount(&mut self, size: SurfaceSize);

    /// Render decoded shell output
    fn write(&mut self, data: &str);

    /// Release anything held by the surface. Called once, on detach.
    fn dispose(&mut self) {}
}
