// ABOUTME: Launcher form state: identifier and runtime fields, loading flag and the submit flow
// Navigation to the coding view only happens after provisioning succeeds

use crate::launcher::provisioning::{ProvisionError, Provisioner};
use crate::models::{random_slug, RuntimeKind, SessionDescriptor};
use reqwest::Url;
use thiserror::Error;
use tracing::{error, info, warn};

/// Form heading
pub const TITLE: &str = "QuickCode";
/// One-line pitch under the heading
pub const PITCH: &str = "Write, Run, Build Your Code, Your Way - No Installation Needed. We Handle Node.js, Python, and More.";
/// Trigger label while the form can be submitted
pub const IDLE_LABEL: &str = "Good to Go Now, Start Coding";
/// Trigger label while provisioning is in flight
pub const LOADING_LABEL: &str = "Starting your Environment...";

const ROUTE_BASE: &str = "http://quickcode.local/coding/";

/// Why a submit did not lead to the coding view
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A provisioning call is already in flight
    #[error("A session is already being started")]
    AlreadySubmitting,

    /// The identifier field is blank
    #[error("Session identifier must not be empty")]
    EmptyIdentifier,

    /// The provisioning call failed
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Where the launcher goes after a successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Coding view for a provisioned session
    Coding {
        /// Session identifier
        identifier: String,
    },
}

impl Destination {
    /// Identifier of the target session
    pub fn identifier(&self) -> &str {
        match self {
            Destination::Coding { identifier } => identifier,
        }
    }

    /// `/coding/?identifier=<value>` with the value query-encoded
    pub fn route(&self) -> String {
        let identifier = self.identifier();
        Url::parse_with_params(ROUTE_BASE, &[("identifier", identifier)])
            .ok()
            .and_then(|url| url.query().map(|query| format!("{}?{}", url.path(), query)))
            .unwrap_or_else(|| format!("/coding/?identifier={}", identifier))
    }
}

/// Launcher form
#[derive(Debug, Clone)]
pub struct LauncherState {
    /// Session identifier as typed
    pub identifier: String,
    /// Selected runtime
    pub runtime: RuntimeKind,
    loading: bool,
    last_error: Option<String>,
}

impl Default for LauncherState {
    fn default() -> Self {
        Self::new()
    }
}

impl LauncherState {
    /// Fresh form with a random slug and the default runtime
    pub fn new() -> Self {
        Self::with_fields(random_slug(), RuntimeKind::default())
    }

    /// Form prefilled with the given values
    pub fn with_fields(identifier: impl Into<String>, runtime: RuntimeKind) -> Self {
        Self {
            identifier: identifier.into(),
            runtime,
            loading: false,
            last_error: None,
        }
    }

    /// True between `begin_submit` and `finish_submit`
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed submit, cleared on the next one
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Show a failure that happened after the provisioning call settled
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Label of the submit trigger for the current state
    pub fn trigger_label(&self) -> &'static str {
        if self.loading {
            LOADING_LABEL
        } else {
            IDLE_LABEL
        }
    }

    /// Append a typed character. Control characters are ignored.
    pub fn push_char(&mut self, ch: char) {
        if !self.loading && !ch.is_control() {
            self.identifier.push(ch);
        }
    }

    /// Append pasted text, skipping control characters
    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    /// Delete the last character of the identifier
    pub fn backspace(&mut self) {
        if !self.loading {
            self.identifier.pop();
        }
    }

    /// Select the following runtime
    pub fn next_runtime(&mut self) {
        if !self.loading {
            self.runtime = self.runtime.next();
        }
    }

    /// Select the preceding runtime
    pub fn previous_runtime(&mut self) {
        if !self.loading {
            self.runtime = self.runtime.previous();
        }
    }

    /// Disable the trigger and build the descriptor to send.
    /// Surrounding whitespace is stripped from the field itself so the form shows what is sent.
    pub fn begin_submit(&mut self) -> Result<SessionDescriptor, LaunchError> {
        if self.loading {
            warn!("Ignoring submit while a session is already starting");
            return Err(LaunchError::AlreadySubmitting);
        }
        let trimmed = self.identifier.trim();
        if trimmed.len() != self.identifier.len() {
            self.identifier = trimmed.to_string();
        }
        if self.identifier.is_empty() {
            self.last_error = Some(LaunchError::EmptyIdentifier.to_string());
            return Err(LaunchError::EmptyIdentifier);
        }

        let descriptor = SessionDescriptor::new(self.identifier.clone(), self.runtime);
        self.loading = true;
        self.last_error = None;
        Ok(descriptor)
    }

    /// Re-enable the trigger and decide where to go
    pub fn finish_submit(
        &mut self,
        descriptor: &SessionDescriptor,
        result: Result<(), ProvisionError>,
    ) -> Result<Destination, LaunchError> {
        self.loading = false;
        match result {
            Ok(()) => {
                info!("Session {} provisioned", descriptor.identifier);
                Ok(Destination::Coding {
                    identifier: descriptor.identifier.clone(),
                })
            }
            Err(e) => {
                error!("Failed to provision session {}: {}", descriptor.identifier, e);
                self.last_error = Some(e.to_string());
                Err(LaunchError::Provision(e))
            }
        }
    }

    /// Full submit: one provisioning call, then a destination on success
    pub async fn submit(&mut self, provisioner: &dyn Provisioner) -> Result<Destination, LaunchError> {
        let descriptor = self.begin_submit()?;
        let result = provisioner.provision(&descriptor).await;
        self.finish_submit(&descriptor, result)
    }
}
