// ABOUTME: Core data models shared by the launcher and the coding view

/// Session descriptor and runtimes
pub mod session;

pub use session::{random_slug, random_slug_with, RuntimeKind, SessionDescriptor, SLUG_WORDS};
