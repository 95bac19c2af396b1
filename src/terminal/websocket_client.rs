// ABOUTME: WebSocket transport implementing the terminal connection handle
// Owns the socket task; outbound events queue until the handshake completes, inbound events fan out to listeners

use crate::terminal::connection::{ConnectionError, ListenerRegistry, Subscription, TerminalConnection};
use crate::terminal::protocol::{ClientEvent, ServerEvent};
use anyhow::{anyhow, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use reqwest::Url;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

/// How long a closing socket may wait for the peer's Close reply
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle of the socket task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Handshake done, frames flowing
    Connected,
    /// Closed by either side
    Disconnected,
    /// Failed to connect or broke mid-session
    Error,
}

/// Snapshot of the connection for display
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    /// Current lifecycle state
    pub state: ConnectionState,
    /// Failure that moved the connection to `Error`
    pub last_error: Option<String>,
}

/// Terminal connection over a WebSocket, driven by a background task
pub struct WebSocketConnection {
    /// WebSocket URL of the shell service, including the session query
    url: String,

    /// Current connection status
    status: Arc<RwLock<ConnectionStatus>>,

    /// Outbound events, drained by the socket task in order
    outbound: mpsc::UnboundedSender<ClientEvent>,

    /// Inbound listeners
    listeners: ListenerRegistry,

    /// Asks the socket task to send Close and finish
    shutdown: Mutex<Option<oneshot::Sender<()>>>,

    /// Task handle for the socket loop
    connection_handle: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketConnection {
    /// Build the socket URL for one session: `{terminal_url}?identifier=<id>`
    pub fn session_url(terminal_url: &str, identifier: &str) -> Result<String> {
        let mut url = Url::parse(terminal_url)
            .map_err(|e| anyhow!("Invalid terminal URL '{}': {}", terminal_url, e))?;
        url.query_pairs_mut().append_pair("identifier", identifier);
        Ok(url.to_string())
    }

    /// Start connecting in the background. Must be called inside a tokio runtime.
    /// Events emitted before the handshake finishes are sent once it does.
    pub fn open(url: impl Into<String>) -> Self {
        let url = url.into();
        info!("Opening terminal connection to {}", url);

        let status = Arc::new(RwLock::new(ConnectionStatus {
            state: ConnectionState::Connecting,
            last_error: None,
        }));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let listeners = ListenerRegistry::new();

        let handle = tokio::spawn(Self::run(
            url.clone(),
            status.clone(),
            outbound_rx,
            shutdown_rx,
            listeners.clone(),
        ));

        Self {
            url,
            status,
            outbound,
            listeners,
            shutdown: Mutex::new(Some(shutdown)),
            connection_handle: Mutex::new(Some(handle)),
        }
    }

    /// Open a connection for a provisioned session
    pub fn open_session(terminal_url: &str, identifier: &str) -> Result<Self> {
        Ok(Self::open(Self::session_url(terminal_url, identifier)?))
    }

    /// Socket URL including the session query
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current status snapshot
    pub fn status(&self) -> ConnectionStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True once the handshake completed and until the socket closes
    pub fn is_connected(&self) -> bool {
        self.status().state == ConnectionState::Connected
    }

    /// Close the socket with a Close frame and stop emitting.
    /// Listeners are told the connection went away.
    pub fn close(&self) {
        let shutdown = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(shutdown) = shutdown {
            info!("Closing terminal connection to {}", self.url);
            let _ = shutdown.send(());
            set_state(&self.status, ConnectionState::Disconnected, None);
            self.listeners
                .dispatch(&ServerEvent::Disconnected { reason: None });
        }
    }

    async fn run(
        url: String,
        status: Arc<RwLock<ConnectionStatus>>,
        mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
        mut shutdown_rx: oneshot::Receiver<()>,
        listeners: ListenerRegistry,
    ) {
        let result = Self::connection_handler(
            &url,
            &status,
            &mut outbound_rx,
            &mut shutdown_rx,
            &listeners,
        )
        .await;
        match result {
            Ok(()) => {
                info!("Terminal connection closed normally");
                set_state(&status, ConnectionState::Disconnected, None);
                listeners.dispatch(&ServerEvent::Disconnected { reason: None });
            }
            Err(e) => {
                error!("Terminal connection error: {}", e);
                set_state(&status, ConnectionState::Error, Some(e.to_string()));
                listeners.dispatch(&ServerEvent::Disconnected {
                    reason: Some(e.to_string()),
                });
            }
        }
    }

    /// Handle a single WebSocket connection
    async fn connection_handler(
        url: &str,
        status: &RwLock<ConnectionStatus>,
        outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
        shutdown_rx: &mut oneshot::Receiver<()>,
        listeners: &ListenerRegistry,
    ) -> Result<()> {
        debug!("Attempting WebSocket handshake with {}", url);

        let connected = tokio::select! {
            connected = connect_async(url) => connected,
            _ = &mut *shutdown_rx => {
                info!("Closed before the handshake finished");
                return Ok(());
            }
        };
        let (ws_stream, response) = connected.map_err(|e| {
            if e.to_string().contains("refused") {
                error!("Connection refused - is the shell service running?");
            }
            anyhow!("Failed to connect: {}", e)
        })?;

        info!("WebSocket connected to {}", url);
        debug!("WebSocket response status: {:?}", response.status());
        set_state(status, ConnectionState::Connected, None);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                outgoing = outbound_rx.recv() => {
                    match outgoing {
                        Some(event) => {
                            let json = event.to_json()?;
                            ws_sender
                                .send(tungstenite::Message::Text(json))
                                .await
                                .map_err(|e| anyhow!("Failed to send {}: {}", event.event_name(), e))?;
                            debug!("Sent {}", event.event_name());
                        }
                        None => {
                            info!("Connection handle dropped, closing socket");
                            close_gracefully(&mut ws_sender, &mut ws_receiver).await;
                            break;
                        }
                    }
                }

                // Fires on close() and when the handle is dropped
                _ = &mut *shutdown_rx => {
                    info!("Closing socket to {}", url);
                    close_gracefully(&mut ws_sender, &mut ws_receiver).await;
                    break;
                }

                incoming = ws_receiver.next() => {
                    match incoming {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match ServerEvent::from_text(&text) {
                                Ok(Some(event)) => {
                                    listeners.dispatch(&event);
                                }
                                Ok(None) => debug!("Ignoring non-terminal event"),
                                Err(e) => warn!("Dropping inbound frame: {}", e),
                            }
                        }
                        Some(Ok(tungstenite::Message::Binary(bytes))) => {
                            listeners.dispatch(&ServerEvent::from_binary(bytes));
                        }
                        Some(Ok(tungstenite::Message::Close(_))) => {
                            info!("WebSocket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong are answered by tungstenite
                        }
                        Some(Err(e)) => return Err(anyhow!("WebSocket error: {}", e)),
                        None => {
                            info!("WebSocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl TerminalConnection for WebSocketConnection {
    fn emit(&self, event: ClientEvent) -> Result<(), ConnectionError> {
        match self.status().state {
            ConnectionState::Connecting | ConnectionState::Connected => {}
            ConnectionState::Disconnected | ConnectionState::Error => {
                return Err(ConnectionError::Closed);
            }
        }

        let name = event.event_name();
        self.outbound.send(event).map_err(|e| ConnectionError::Send {
            event: name,
            reason: e.to_string(),
        })
    }

    fn subscribe(&self) -> Subscription {
        self.listeners.subscribe()
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        // Dropping the shutdown sender starts the close handshake
        self.shutdown
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut handle) = self
            .connection_handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        if handle.is_finished() {
            return;
        }

        // Abort only a task that does not wind down on its own
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(CLOSE_GRACE * 2, &mut handle).await.is_err() {
                        warn!("Socket task did not stop in time, aborting");
                        handle.abort();
                    }
                });
            }
            Err(_) => handle.abort(),
        }
    }
}

/// Send Close and wait briefly for the peer's reply so the handshake completes
async fn close_gracefully<W, R>(sender: &mut W, receiver: &mut R)
where
    W: Sink<tungstenite::Message> + Unpin,
    R: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    if sender.send(tungstenite::Message::Close(None)).await.is_err() {
        return;
    }
    let drained = tokio::time::timeout(CLOSE_GRACE, async {
        while let Some(Ok(message)) = receiver.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    if drained.is_err() {
        debug!("Peer did not answer Close in time");
    }
}

fn set_state(status: &RwLock<ConnectionStatus>, state: ConnectionState, error: Option<String>) {
    let mut guard = status.write().unwrap_or_else(PoisonError::into_inner);
    guard.state = state;
    guard.last_error = error;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::protocol::TerminalFrame;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_session_url_appends_identifier() {
        let url = WebSocketConnection::session_url("ws://localhost:3001/terminal", "cardogcomputer")
            .unwrap();
        assert_eq!(url, "ws://localhost:3001/terminal?identifier=cardogcomputer");

        let encoded =
            WebSocketConnection::session_url("ws://localhost:3001/terminal", "a b&c").unwrap();
        assert_eq!(encoded, "ws://localhost:3001/terminal?identifier=a+b%26c");
    }

    #[test]
    fn test_session_url_rejects_garbage() {
        assert!(WebSocketConnection::session_url("not a url", "x").is_err());
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let mut received = Vec::new();
            for _ in 0..2 {
                match ws.next().await {
                    Some(Ok(tungstenite::Message::Text(text))) => received.push(text),
                    other => panic!("unexpected frame: {:?}", other),
                }
            }

            ws.send(tungstenite::Message::Text(
                r#"{"event":"terminal","data":{"data":"$ "}}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.send(tungstenite::Message::Text(
                r#"{"event":"terminal","data":{"data":true}}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.send(tungstenite::Message::Binary(vec![104, 105]))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            received
        });

        let connection = WebSocketConnection::open(format!("ws://{}/terminal", addr));
        let mut subscription = connection.subscribe();

        // Queued before the handshake completes
        connection.emit(ClientEvent::RequestTerminal).unwrap();
        connection.emit(ClientEvent::terminal_data("\n")).unwrap();

        assert_eq!(
            subscription.recv().await,
            Some(ServerEvent::Terminal(TerminalFrame::Text("$ ".into())))
        );
        // The malformed frame in between was dropped
        assert_eq!(
            subscription.recv().await,
            Some(ServerEvent::Terminal(TerminalFrame::Bytes(vec![104, 105])))
        );
        assert!(matches!(
            subscription.recv().await,
            Some(ServerEvent::Disconnected { .. })
        ));

        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![
                r#"{"event":"requestTerminal"}"#.to_string(),
                r#"{"event":"terminalData","data":{"data":"\n"}}"#.to_string(),
            ]
        );

        assert_eq!(connection.status().state, ConnectionState::Disconnected);
        assert_eq!(
            connection.emit(ClientEvent::terminal_data("late")),
            Err(ConnectionError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_sends_close_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let mut seen = Vec::new();
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(tungstenite::Message::Text(text)) => {
                        seen.push(text);
                        ws.send(tungstenite::Message::Text(
                            r#"{"event":"terminal","data":{"data":"$ "}}"#.to_string(),
                        ))
                        .await
                        .unwrap();
                    }
                    Ok(tungstenite::Message::Close(_)) => {
                        seen.push("<close>".to_string());
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        seen.push(format!("<error: {}>", e));
                        break;
                    }
                }
            }
            seen
        });

        let connection = WebSocketConnection::open(format!("ws://{}/terminal", addr));
        let mut subscription = connection.subscribe();
        connection.emit(ClientEvent::RequestTerminal).unwrap();

        // Wait for the handshake and the first push before closing
        assert!(matches!(
            subscription.recv().await,
            Some(ServerEvent::Terminal(_))
        ));
        assert!(connection.is_connected());

        connection.close();
        assert!(!connection.is_connected());
        assert!(matches!(
            subscription.recv().await,
            Some(ServerEvent::Disconnected { reason: None })
        ));
        drop(connection);

        let seen = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            seen,
            vec![
                r#"{"event":"requestTerminal"}"#.to_string(),
                "<close>".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_refused_connection_reports_disconnect() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let connection = WebSocketConnection::open(format!("ws://{}/terminal", addr));
        let mut subscription = connection.subscribe();

        match subscription.recv().await {
            Some(ServerEvent::Disconnected { reason }) => assert!(reason.is_some()),
            other => panic!("expected disconnect, got {:?}", other),
        }
        assert_eq!(connection.status().state, ConnectionState::Error);
    }
}
