//! Token check for API callers

use axum::http::HeaderMap;

use crate::api::AppError;
use crate::config::AuthConfig;

/// Header carrying the caller's API token
pub const TOKEN_HEADER: &str = "ota-token";

/// Response header advertising the caller's device quota
pub const MAX_DEVICES_HEADER: &str = "x-max-devices";

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    max_devices: i64,
}

impl Principal {
    /// Device quota, `None` when unlimited
    pub fn max_devices(&self) -> Option<i64> {
        (self.max_devices != -1).then_some(self.max_devices)
    }
}

/// Check the `OTA-TOKEN` header against the configured tokens
///
/// With no tokens configured every caller is accepted.
pub fn authorize(headers: &HeaderMap, auth: &AuthConfig) -> Result<Principal, AppError> {
    let principal = Principal {
        max_devices: auth.max_devices,
    };
    if auth.tokens.is_empty() {
        return Ok(principal);
    }

    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if auth.tokens.iter().any(|known| known == token) {
        Ok(principal)
    } else {
        Err(AppError::Unauthorized)
    }
}
