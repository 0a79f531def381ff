//! Per-ECU auto-update subscriptions on the director

use otagate_api::Device;
use otagate_client::BackendClient;
use serde_json::Value;
use tracing::{info, instrument};

use crate::backends::Backends;
use crate::catalog::{fetch_targets, find_by_hash};
use crate::devices::require_image;
use crate::error::CoreError;

fn subscription_resource(uuid: &str, ecu: &str) -> String {
    format!("/api/v1/admin/devices/{uuid}/ecus/{ecu}/auto_update")
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether `ecu` on `device` follows a subscription
///
/// # Errors
/// Returns `CoreError::Backend` if the director call fails.
pub async fn get_autoupdates(
    director: &BackendClient,
    device: &Device,
    ecu: &str,
) -> Result<bool, CoreError> {
    let value: Value = director
        .get(&subscription_resource(&device.uuid, ecu))
        .await?;
    Ok(is_truthy(&value))
}

/// Subscribe the primary ECU to the target line it runs, or unsubscribe it
///
/// Enabling looks up the catalog target matching the installed image and
/// subscribes to its `custom.name`.
///
/// # Errors
/// - `CoreError::PreconditionFailed` if the device never checked in
/// - `CoreError::SubscriptionTargetNotFound` if no named target matches the installed image
/// - `CoreError::Backend` for backend failures
#[instrument(skip(backends, device), fields(device = %device.uuid))]
pub async fn set_autoupdates(
    backends: &Backends,
    device: &Device,
    enabled: bool,
) -> Result<Value, CoreError> {
    let image = require_image(&backends.director, device).await?;
    let resource = subscription_resource(&device.uuid, &image.id);

    if !enabled {
        let value = backends.director.delete(&resource).await?;
        info!(ecu = %image.id, "auto-updates disabled");
        return Ok(value);
    }

    let catalog = fetch_targets(&backends.repo).await?;
    let name = find_by_hash(&catalog, image.sha256())
        .and_then(|(_, target)| target.custom.name.as_deref())
        .ok_or_else(|| CoreError::SubscriptionTargetNotFound(image.sha256().to_string()))?;

    let value = backends
        .director
        .put(&format!("{resource}/{name}"))
        .await?;
    info!(ecu = %image.id, subscription = name, "auto-updates enabled");
    Ok(value)
}
