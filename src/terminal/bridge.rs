// ABOUTME: Terminal bridge wiring one terminal surface to one remote shell connection
// Attach requests a shell and primes it; detach releases the listener and the surface on every exit path

use crate::terminal::connection::{ConnectionError, Subscription, TerminalConnection};
use crate::terminal::keys::encode_key;
use crate::terminal::protocol::{ByteDecoding, ClientEvent, ServerEvent};
use crate::terminal::surface::{SurfaceSize, TerminalSurface};
use crossterm::event::KeyEvent;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Input sent right after attaching so the remote shell prints its prompt
const PRIMING_INPUT: &str = "\n";

/// Failures of bridge operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The bridge was detached
    #[error("Terminal bridge is detached")]
    Detached,

    /// The connection refused an event
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Bridge lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Listening and forwarding
    Attached,
    /// Released, inert
    Detached,
}

/// Resources held while attached. Dropped together on detach.
struct Attachment<S> {
    subscription: Subscription,
    surface: S,
}

/// Binds one surface to one connection for as long as it is attached
pub struct TerminalBridge<S: TerminalSurface> {
    connection: Arc<dyn TerminalConnection>,
    attachment: Option<Attachment<S>>,
    decoding: ByteDecoding,
    connection_lost: Option<String>,
}

impl<S: TerminalSurface> TerminalBridge<S> {
    /// Request a shell, start listening, fit the surface and prime the prompt.
    /// On failure nothing stays registered and the surface is disposed.
    pub fn attach(
        connection: Arc<dyn TerminalConnection>,
        mut surface: S,
        size: SurfaceSize,
        decoding: ByteDecoding,
    ) -> Result<Self, BridgeError> {
        if let Err(e) = connection.emit(ClientEvent::RequestTerminal) {
            surface.dispose();
            return Err(e.into());
        }
        let subscription = connection.subscribe();
        surface.mount(size);

        let bridge = Self {
            connection,
            attachment: Some(Attachment {
                subscription,
                surface,
            }),
            decoding,
            connection_lost: None,
        };

        // On error the bridge drops here, which detaches it
        bridge.send_input(PRIMING_INPUT)?;
        info!("Terminal bridge attached ({}x{})", size.cols, size.rows);
        Ok(bridge)
    }

    /// Current lifecycle state
    pub fn state(&self) -> BridgeState {
        if self.attachment.is_some() {
            BridgeState::Attached
        } else {
            BridgeState::Detached
        }
    }

    /// Shorthand for `state() == Attached`
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Forward keystrokes or pasted text verbatim
    pub fn send_input(&self, data: &str) -> Result<(), BridgeError> {
        if self.attachment.is_none() {
            return Err(BridgeError::Detached);
        }
        self.connection.emit(ClientEvent::terminal_data(data))?;
        Ok(())
    }

    /// Encode and forward a key press. Returns whether anything was sent.
    pub fn send_key(&self, key: KeyEvent) -> Result<bool, BridgeError> {
        match encode_key(key) {
            Some(data) => self.send_input(&data).map(|()| true),
            None => Ok(false),
        }
    }

    /// Render every inbound event already queued. Returns how many frames were written.
    pub fn pump(&mut self) -> usize {
        let mut written = 0;
        while let Some(event) = self
            .attachment
            .as_mut()
            .and_then(|attachment| attachment.subscription.try_recv())
        {
            if self.render(event) {
                written += 1;
            }
        }
        written
    }

    /// Wait for the next inbound event and render it. `false` once detached or
    /// once the connection side has gone away.
    pub async fn next_event(&mut self) -> bool {
        let event = match self.attachment.as_mut() {
            Some(attachment) => attachment.subscription.recv().await,
            None => return false,
        };
        match event {
            Some(event) => {
                self.render(event);
                true
            }
            None => false,
        }
    }

    fn render(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::Terminal(frame) => {
                let text = frame.into_text(self.decoding);
                match self.attachment.as_mut() {
                    Some(attachment) => {
                        attachment.surface.write(&text);
                        true
                    }
                    None => false,
                }
            }
            ServerEvent::Disconnected { reason } => {
                let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                warn!("Terminal connection lost: {}", reason);
                self.connection_lost = Some(reason);
                false
            }
        }
    }

    /// Why the connection went away, once it has
    pub fn connection_lost(&self) -> Option<&str> {
        self.connection_lost.as_deref()
    }

    /// Surface while attached
    pub fn surface(&self) -> Option<&S> {
        self.attachment.as_ref().map(|attachment| &attachment.surface)
    }

    /// Mutable surface while attached
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.attachment.as_mut().map(|attachment| &mut attachment.surface)
    }

    /// Deregister the inbound listener, stop forwarding input and dispose the
    /// surface. Safe to call more than once.
    pub fn detach(&mut self) {
        if let Some(Attachment {
            subscription,
            mut surface,
        }) = self.attachment.take()
        {
            drop(subscription);
            surface.dispose();
            debug!("Terminal bridge detached");
        }
    }
}

impl<S: TerminalSurface> Drop for TerminalBridge<S> {
    fn drop(&mut self) {
        self.detach();
    }
}
