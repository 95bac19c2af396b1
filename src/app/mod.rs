// ABOUTME: Main application structure and state management for the TUI

/// Input mapping
pub mod events;
/// App and view state
pub mod state;

pub use events::{AppEvent, EventHandler};
pub use state::{App, AppState, AsyncAction, CodingSession, View};
