// ABOUTME: End-to-end tests of the app flow: submit the launcher, provision, then drive the shell
// over a local WebSocket server

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures_util::{SinkExt, StreamExt};
use quickcode::app::{App, AppEvent, EventHandler, View};
use quickcode::config::AppConfig;
use quickcode::launcher::{LauncherState, ProvisionError, Provisioner};
use quickcode::models::{RuntimeKind, SessionDescriptor};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Provisioner answering with a fixed status and recording every call
struct StubProvisioner {
    status: Option<StatusCode>,
    calls: Arc<Mutex<Vec<SessionDescriptor>>>,
}

impl StubProvisioner {
    fn succeeding() -> (Arc<Self>, Arc<Mutex<Vec<SessionDescriptor>>>) {
        Self::build(None)
    }

    fn failing(status: StatusCode) -> (Arc<Self>, Arc<Mutex<Vec<SessionDescriptor>>>) {
        Self::build(Some(status))
    }

    fn build(status: Option<StatusCode>) -> (Arc<Self>, Arc<Mutex<Vec<SessionDescriptor>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                status,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl Provisioner for StubProvisioner {
    async fn provision(&self, descriptor: &SessionDescriptor) -> Result<(), ProvisionError> {
        self.calls.lock().unwrap().push(descriptor.clone());
        match self.status {
            Some(status) => Err(ProvisionError::Status(status)),
            None => Ok(()),
        }
    }
}

/// Provisioner whose call never completes
struct HungProvisioner;

#[async_trait]
impl Provisioner for HungProvisioner {
    async fn provision(&self, _descriptor: &SessionDescriptor) -> Result<(), ProvisionError> {
        std::future::pending().await
    }
}

struct ShellServer {
    terminal_url: String,
    /// Request path including the query the client connected with
    path: oneshot::Receiver<String>,
    /// Text frames received from the client, in order
    received: Arc<Mutex<Vec<String>>>,
}

/// WebSocket server that answers the first client frame with a prompt and echoes keystrokes
async fn spawn_shell_server() -> ShellServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel();
    let received = Arc::new(Mutex::new(Vec::new()));

    let frames = received.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback =
            move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                let _ = path_tx.send(request.uri().to_string());
                Ok(response)
            };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();

        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                frames.lock().unwrap().push("<close>".to_string());
                break;
            }
            let Message::Text(text) = message else {
                continue;
            };
            frames.lock().unwrap().push(text.clone());

            let reply = if text.contains("requestTerminal") {
                r#"{"event":"terminal","data":{"data":"$ "}}"#.to_string()
            } else {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                let echoed = value["data"]["data"].as_str().unwrap_or_default().to_string();
                serde_json::json!({ "event": "terminal", "data": { "data": echoed } }).to_string()
            };
            if ws.send(Message::Text(reply)).await.is_err() {
                break;
            }
        }
    });

    ShellServer {
        terminal_url: format!("ws://{}/terminal", addr),
        path: path_rx,
        received,
    }
}

fn config_for(terminal_url: &str) -> AppConfig {
    AppConfig {
        terminal_url: terminal_url.to_string(),
        ..AppConfig::default()
    }
}

fn screen(app: &App) -> String {
    app.state
        .coding
        .as_ref()
        .and_then(|coding| coding.bridge.surface())
        .map(|surface| surface.contents())
        .unwrap_or_default()
}

/// Tick until the provisioning call has settled
async fn wait_for_provisioning(app: &mut App) {
    for _ in 0..100 {
        app.tick().await.unwrap();
        if !app.is_provisioning() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("provisioning never settled");
}

/// Tick until the shell screen contains `needle`
async fn wait_for_screen(app: &mut App, needle: &str) {
    for _ in 0..100 {
        app.tick().await.unwrap();
        if screen(app).contains(needle) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("screen never showed {:?}, got {:?}", needle, screen(app));
}

#[tokio::test]
async fn test_failed_provisioning_stays_on_launcher() {
    let (provisioner, calls) = StubProvisioner::failing(StatusCode::SERVICE_UNAVAILABLE);
    let mut app = App::with_provisioner(
        AppConfig::default(),
        LauncherState::with_fields("test123", RuntimeKind::Python),
        provisioner,
    );

    EventHandler::process_event(AppEvent::LauncherSubmit, &mut app.state);
    assert!(app.state.launcher.is_loading());
    wait_for_provisioning(&mut app).await;

    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(app.state.current_view, View::Launcher);
    assert!(app.state.coding.is_none());
    assert!(!app.state.launcher.is_loading());
    assert!(app.state.launcher.last_error().is_some());
}

#[tokio::test]
async fn test_successful_provisioning_opens_shell() {
    let server = spawn_shell_server().await;
    let (provisioner, calls) = StubProvisioner::succeeding();
    let mut app = App::with_provisioner(
        config_for(&server.terminal_url),
        LauncherState::with_fields("test123", RuntimeKind::Python),
        provisioner,
    );

    EventHandler::process_event(AppEvent::LauncherSubmit, &mut app.state);
    wait_for_provisioning(&mut app).await;

    assert_eq!(
        calls.lock().unwrap().as_slice(),
        &[SessionDescriptor::new("test123", RuntimeKind::Python)]
    );
    assert_eq!(app.state.current_view, View::Coding);
    let coding = app.state.coding.as_ref().unwrap();
    assert_eq!(coding.identifier, "test123");
    assert_eq!(coding.route, "/coding/?identifier=test123");
    assert!(coding.bridge.is_attached());
    assert!(coding.bridge.surface().unwrap().is_mounted());

    wait_for_screen(&mut app, "$").await;
    assert_eq!(server.path.await.unwrap(), "/terminal?identifier=test123");

    EventHandler::process_event(AppEvent::TerminalInput("ls".to_string()), &mut app.state);
    wait_for_screen(&mut app, "ls").await;

    let received = server.received.lock().unwrap().clone();
    assert_eq!(
        received,
        vec![
            r#"{"event":"requestTerminal"}"#.to_string(),
            r#"{"event":"terminalData","data":{"data":"\n"}}"#.to_string(),
            r#"{"event":"terminalData","data":{"data":"ls"}}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_leaving_coding_releases_session() {
    let server = spawn_shell_server().await;
    let (provisioner, _calls) = StubProvisioner::succeeding();
    let mut app = App::with_provisioner(
        config_for(&server.terminal_url),
        LauncherState::with_fields("test123", RuntimeKind::NodeJs),
        provisioner,
    );

    EventHandler::process_event(AppEvent::LauncherSubmit, &mut app.state);
    wait_for_provisioning(&mut app).await;
    wait_for_screen(&mut app, "$").await;

    EventHandler::process_event(AppEvent::LeaveCoding, &mut app.state);

    assert_eq!(app.state.current_view, View::Launcher);
    assert!(app.state.coding.is_none());
    assert!(!app.state.launcher.is_loading());

    // The shell service sees a clean close handshake
    for _ in 0..100 {
        if server.received.lock().unwrap().iter().any(|f| f == "<close>") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "server never saw Close, got {:?}",
        server.received.lock().unwrap()
    );
}

#[tokio::test]
async fn test_hung_provisioning_keeps_ui_responsive() {
    let mut app = App::with_provisioner(
        AppConfig::default(),
        LauncherState::with_fields("test123", RuntimeKind::Python),
        Arc::new(HungProvisioner),
    );

    EventHandler::process_event(AppEvent::LauncherSubmit, &mut app.state);
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(1), app.tick())
            .await
            .expect("tick must not wait on the provisioning call")
            .unwrap();
    }

    assert!(app.is_provisioning());
    assert!(app.state.launcher.is_loading());
    assert_eq!(app.state.launcher.trigger_label(), "Starting your Environment...");

    // Quitting still works while the call hangs
    let quit = EventHandler::handle_key_event(
        KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
        &app.state,
    )
    .unwrap();
    EventHandler::process_event(quit, &mut app.state);
    assert!(app.state.should_quit);
}

#[tokio::test]
async fn test_bad_terminal_url_is_reported_on_form() {
    let (provisioner, _calls) = StubProvisioner::succeeding();
    let mut app = App::with_provisioner(
        config_for("not a url"),
        LauncherState::with_fields("test123", RuntimeKind::Python),
        provisioner,
    );

    EventHandler::process_event(AppEvent::LauncherSubmit, &mut app.state);
    wait_for_provisioning(&mut app).await;

    assert_eq!(app.state.current_view, View::Launcher);
    assert!(app
        .state
        .launcher
        .last_error()
        .unwrap()
        .contains("Could not open terminal"));
}
