// ABOUTME: Client for the external provisioning service that allocates remote coding sessions

use crate::models::SessionDescriptor;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on one provisioning request, connect included
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a provisioning call did not succeed
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Transport failure or timeout
    #[error("Provisioning request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Provisioning service returned {0}")]
    Status(StatusCode),

    /// The background task running the call panicked or was cancelled
    #[error("Provisioning task failed: {0}")]
    Task(String),
}

/// Allocates the remote environment for a session
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Ask for the session to be created. Called once per submit.
    async fn provision(&self, descriptor: &SessionDescriptor) -> Result<(), ProvisionError>;
}

/// `POST {service_url}/project` with the descriptor as JSON
pub struct HttpProvisioner {
    client: reqwest::Client,
    service_url: String,
}

impl HttpProvisioner {
    /// Provisioner for `service_url` with [`DEFAULT_TIMEOUT`]
    pub fn new(service_url: impl Into<String>) -> Self {
        Self::with_timeout(service_url, DEFAULT_TIMEOUT)
    }

    /// Provisioner whose requests give up after `timeout`
    pub fn with_timeout(service_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self::with_client(client, service_url)
    }

    /// Provisioner using a caller-configured client
    pub fn with_client(client: reqwest::Client, service_url: impl Into<String>) -> Self {
        Self {
            client,
            service_url: service_url.into(),
        }
    }

    /// `{service_url}/project`, tolerating a trailing slash
    pub fn endpoint(&self) -> String {
        format!("{}/project", self.service_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn provision(&self, descriptor: &SessionDescriptor) -> Result<(), ProvisionError> {
        let endpoint = self.endpoint();
        info!(
            "Provisioning session {} ({}) via {}",
            descriptor.identifier, descriptor.runtime_kind, endpoint
        );

        let response = self.client.post(&endpoint).json(descriptor).send().await?;
        let status = response.status();
        debug!("Provisioning service responded with {}", status);

        if !status.is_success() {
            return Err(ProvisionError::Status(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_path() {
        assert_eq!(
            HttpProvisioner::new("http://localhost:3001").endpoint(),
            "http://localhost:3001/project"
        );
        assert_eq!(
            HttpProvisioner::new("http://localhost:3001/").endpoint(),
            "http://localhost:3001/project"
        );
    }
}
