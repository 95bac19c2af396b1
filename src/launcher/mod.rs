// ABOUTME: Session launcher: form state and the provisioning client it submits through

/// Provisioning service client
pub mod provisioning;
/// Form state and submit flow
pub mod state;

pub use provisioning::{HttpProvisioner, ProvisionError, Provisioner};
pub use state::{Destination, LaunchError, LauncherState};
