// ABOUTME: Terminal module bridging a remote shell connection to a local terminal emulator surface
// Provides the event protocol, the connection seam, the WebSocket transport and the vt100 surface

/// Surface to connection binding
pub mod bridge;
/// Connection handle abstraction
pub mod connection;
/// Key encoding
pub mod keys;
/// Wire events
pub mod protocol;
/// Surface trait and options
pub mod surface;
/// vt100 widget
pub mod terminal_emulator;
/// WebSocket transport
pub mod websocket_client;

pub use bridge::{BridgeError, BridgeState, TerminalBridge};
pub use connection::{ConnectionError, ListenerRegistry, Subscription, TerminalConnection};
pub use protocol::{ByteDecoding, ClientEvent, ServerEvent, TerminalFrame};
pub use surface::{SurfaceOptions, SurfaceSize, TerminalSurface};
pub use terminal_emulator::TerminalEmulatorWidget;
pub use websocket_client::{ConnectionState, ConnectionStatus, WebSocketConnection};
