// ABOUTME: UI components for the TUI: launcher form, coding view and the layout that switches between them

/// Coding view
pub mod coding;
/// Launcher form
pub mod launcher;
/// View dispatch
pub mod layout;

pub use coding::CodingComponent;
pub use launcher::LauncherComponent;
pub use layout::LayoutComponent;
