// ABOUTME: Library crate for QuickCode exposing the launcher, terminal bridge and TUI for testing and reuse
//! QuickCode: provision a remote coding session and drive its shell from the terminal.

/// Application state and events
pub mod app;
/// Command-line flags
pub mod cli;
/// ratatui views
pub mod components;
/// Configuration loading
pub mod config;
/// Session launcher
pub mod launcher;
/// Shared data models
pub mod models;
/// Terminal bridge and transport
pub mod terminal;
