//! Core error types for otagate-core

use otagate_client::BackendError;
use thiserror::Error;

/// Errors that can occur in orchestration operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A backend answered unexpectedly; its status is kept for the caller
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No device registered under this name
    #[error("Device({0}) does not exist")]
    DeviceNotFound(String),

    /// No catalog target carries the requested hash
    #[error("Could not find image with hash={0}")]
    TargetNotFound(String),

    /// Operation needs state the device does not have yet
    #[error("Device({device}) {reason}")]
    PreconditionFailed {
        /// Device name
        device: String,
        /// What is missing
        reason: String,
    },

    /// The installed image has no catalog target to subscribe to
    #[error("Could not find target to subscribe to for image hash={0}")]
    SubscriptionTargetNotFound(String),

    /// Campaign was created on the director but binding it to the device failed
    #[error("update {update_id} was created but could not be bound to device {device}: {source}")]
    CampaignNotBound {
        /// Identifier returned by the director for the orphaned campaign
        update_id: String,
        /// Device UUID
        device: String,
        #[source]
        source: BackendError,
    },

    /// Backend endpoints could not be turned into clients
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn never_seen(device: &str) -> Self {
        CoreError::PreconditionFailed {
            device: device.to_string(),
            reason: "has not reported an installed image yet".to_string(),
        }
    }

    /// HTTP status class for this error
    ///
    /// Backend failures keep the status the backend reported.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Backend(err) | CoreError::CampaignNotBound { source: err, .. } => {
                err.status().unwrap_or(502)
            }
            CoreError::DeviceNotFound(_)
            | CoreError::TargetNotFound(_)
            | CoreError::SubscriptionTargetNotFound(_) => 404,
            CoreError::PreconditionFailed { .. } => 412,
            CoreError::Config(_) => 500,
        }
    }

    /// Check if the caller may repeat the operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Backend(err) => err.is_retryable(),
            CoreError::CampaignNotBound { .. } => true,
            _ => false,
        }
    }
}
