// ABOUTME: Application state management and view switching between the launcher and the coding view

use crate::config::AppConfig;
use crate::launcher::{Destination, HttpProvisioner, LauncherState, ProvisionError, Provisioner};
use crate::models::SessionDescriptor;
use crate::terminal::{
    SurfaceOptions, SurfaceSize, TerminalBridge, TerminalEmulatorWidget, WebSocketConnection,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Session launcher form
    Launcher,
    /// Attached remote shell
    Coding,
}

/// Work queued by a synchronous event for the next tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncAction {
    /// Provisioning call for a submitted launcher form
    Provision(SessionDescriptor),
}

/// A provisioned session with its live shell
pub struct CodingSession {
    /// Session identifier the shell was provisioned for
    pub identifier: String,
    /// `/coding/?identifier=...` route this view stands for
    pub route: String,
    connection: Arc<WebSocketConnection>,
    /// Bridge between the socket and the emulator widget
    pub bridge: TerminalBridge<TerminalEmulatorWidget>,
}

impl CodingSession {
    /// Transport carrying this session's shell
    pub fn connection(&self) -> &WebSocketConnection {
        &self.connection
    }

    /// Detach the bridge first so its listener is gone before the socket closes
    pub fn close(mut self) {
        info!("Closing session {} on {}", self.identifier, self.connection.url());
        self.bridge.detach();
        self.connection.close();
    }
}

/// UI state shared by the event handler and the views
pub struct AppState {
    /// Screen currently rendered
    pub current_view: View,
    /// Launcher form fields
    pub launcher: LauncherState,
    /// Live session while in the coding view
    pub coding: Option<CodingSession>,
    /// Set once the user asked to exit
    pub should_quit: bool,
    /// Work for the next `App::tick`
    pub pending_async_action: Option<AsyncAction>,
    /// Size of the whole screen, used to fit a new terminal surface
    pub viewport: SurfaceSize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(LauncherState::new())
    }
}

impl AppState {
    /// Start on the launcher with the given form
    pub fn new(launcher: LauncherState) -> Self {
        Self {
            current_view: View::Launcher,
            launcher,
            coding: None,
            should_quit: false,
            pending_async_action: None,
            viewport: SurfaceSize::new(80, 24),
        }
    }

    /// Release any session and stop the event loop
    pub fn quit(&mut self) {
        self.leave_coding();
        self.should_quit = true;
    }

    /// Queue the provisioning call if the trigger is enabled
    pub fn submit_launcher(&mut self) {
        match self.launcher.begin_submit() {
            Ok(descriptor) => {
                self.pending_async_action = Some(AsyncAction::Provision(descriptor));
            }
            Err(e) => warn!("Launcher submit rejected: {}", e),
        }
    }

    /// Forward input to the shell of the current coding session
    pub fn send_terminal_input(&mut self, data: &str) {
        if let Some(coding) = self.coding.as_ref() {
            if let Err(e) = coding.bridge.send_input(data) {
                warn!("Dropped terminal input: {}", e);
            }
        }
    }

    /// Positive scrolls back into history, negative towards the live screen
    pub fn scroll_terminal(&mut self, lines: isize) {
        let Some(surface) = self
            .coding
            .as_mut()
            .and_then(|coding| coding.bridge.surface_mut())
        else {
            return;
        };
        if lines > 0 {
            surface.scroll_up(lines.unsigned_abs());
        } else {
            surface.scroll_down(lines.unsigned_abs());
        }
    }

    /// Go back to the launcher, releasing the bridge and the connection
    pub fn leave_coding(&mut self) {
        if let Some(coding) = self.coding.take() {
            info!("Leaving coding session {}", coding.identifier);
            coding.close();
        }
        self.current_view = View::Launcher;
    }

    /// Render any shell output that arrived since the last frame
    pub fn pump_terminal(&mut self) -> usize {
        self.coding
            .as_mut()
            .map_or(0, |coding| coding.bridge.pump())
    }

    /// Open the connection for a provisioned session and attach a fresh surface
    pub fn enter_coding(&mut self, destination: &Destination, config: &AppConfig) -> Result<()> {
        self.leave_coding();

        let identifier = destination.identifier().to_string();
        let connection = Arc::new(WebSocketConnection::open_session(
            &config.terminal_url,
            &identifier,
        )?);

        let mut surface = TerminalEmulatorWidget::new(SurfaceOptions::default());
        surface.set_title(format!(" {} ", identifier));
        surface.set_focused(true);

        let size = crate::components::coding::surface_size(self.viewport);
        let bridge = TerminalBridge::attach(
            connection.clone(),
            surface,
            size,
            config.byte_decoding,
        )?;

        info!("Navigated to {}", destination.route());
        self.coding = Some(CodingSession {
            identifier,
            route: destination.route(),
            connection,
            bridge,
        });
        self.current_view = View::Coding;
        Ok(())
    }
}

/// A provisioning call running off the UI loop
struct ProvisionTask {
    descriptor: SessionDescriptor,
    handle: JoinHandle<Result<(), ProvisionError>>,
}

/// Top-level application: UI state plus the collaborators it drives
pub struct App {
    /// Everything the views render from
    pub state: AppState,
    config: AppConfig,
    provisioner: Arc<dyn Provisioner>,
    provisioning: Option<ProvisionTask>,
}

impl App {
    /// App talking to the HTTP provisioning service from `config`
    pub fn new(config: AppConfig, launcher: LauncherState) -> Self {
        let provisioner = Arc::new(HttpProvisioner::new(config.service_url.clone()));
        Self::with_provisioner(config, launcher, provisioner)
    }

    /// App with an injected provisioner
    pub fn with_provisioner(
        config: AppConfig,
        launcher: LauncherState,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            state: AppState::new(launcher),
            config,
            provisioner,
            provisioning: None,
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether a provisioning call is still outstanding
    pub fn is_provisioning(&self) -> bool {
        self.provisioning.is_some()
    }

    /// Start queued actions, settle finished ones and render shell output.
    /// Never waits on the network.
    pub async fn tick(&mut self) -> Result<()> {
        if let Some(action) = self.state.pending_async_action.take() {
            self.start_async_action(action);
        }
        self.settle_provisioning().await;
        self.state.pump_terminal();
        Ok(())
    }

    fn start_async_action(&mut self, action: AsyncAction) {
        match action {
            AsyncAction::Provision(descriptor) => {
                let provisioner = self.provisioner.clone();
                let request = descriptor.clone();
                let handle =
                    tokio::spawn(async move { provisioner.provision(&request).await });
                self.provisioning = Some(ProvisionTask { descriptor, handle });
            }
        }
    }

    async fn settle_provisioning(&mut self) {
        if !self
            .provisioning
            .as_ref()
            .is_some_and(|task| task.handle.is_finished())
        {
            return;
        }
        let Some(ProvisionTask { descriptor, handle }) = self.provisioning.take() else {
            return;
        };

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ProvisionError::Task(e.to_string())),
        };

        // Failures are already recorded on the form
        if let Ok(destination) = self.state.launcher.finish_submit(&descriptor, result) {
            if let Err(e) = self.state.enter_coding(&destination, &self.config) {
                warn!("Could not open terminal for {}: {}", descriptor.identifier, e);
                self.state
                    .launcher
                    .report_error(format!("Could not open terminal: {}", e));
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(task) = self.provisioning.take() {
            debug!("Abandoning provisioning of {}", task.descriptor.identifier);
            task.handle.abort();
        }
    }
}
