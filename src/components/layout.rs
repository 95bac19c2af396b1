// ABOUTME: Top-level layout component dispatching to the launcher or the coding view

use ratatui::prelude::*;

use super::{CodingComponent, LauncherComponent};
use crate::app::{AppState, View};

/// Root component switching on the current view
pub struct LayoutComponent {
    launcher: LauncherComponent,
    coding: CodingComponent,
}

impl LayoutComponent {
    /// Layout with fresh child components
    pub fn new() -> Self {
        Self {
            launcher: LauncherComponent::new(),
            coding: CodingComponent::new(),
        }
    }

    /// Draw the whole frame
    pub fn render(&mut self, frame: &mut Frame, state: &AppState) {
        let area = frame.size();
        match state.current_view {
            View::Launcher => self.launcher.render(frame, area, state),
            View::Coding => self.coding.render(frame, area, state),
        }
    }
}

impl Default for LayoutComponent {
    fn default() -> Self {
        Self::new()
    }
}
