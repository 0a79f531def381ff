//! Match an image hash to a catalog target and dispatch a campaign

use otagate_api::requests::MultiTargetUpdate;
use otagate_api::responses::UpdateApplied;
use otagate_api::Device;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::backends::Backends;
use crate::catalog::{fetch_targets, find_by_hash};
use crate::devices::require_image;
use crate::error::CoreError;

/// Director collection of campaigns
pub const MULTI_TARGET_UPDATES_RESOURCE: &str = "/api/v1/multi_target_updates";

fn bind_resource(uuid: &str, update_id: &str) -> String {
    format!("/api/v1/admin/devices/{uuid}/multi_target_update/{update_id}")
}

/// The director answers with the campaign id as a bare JSON string
fn update_id(value: Value) -> String {
    match value {
        Value::String(id) => id,
        other => other.to_string(),
    }
}

/// Move `device` to the catalog target whose sha256 is `image_hash`
///
/// The campaign is keyed by the hardware id of the device's current image.
/// Every call creates a new campaign, and nothing is sent to the director
/// unless a target matches.
///
/// # Errors
/// - `CoreError::PreconditionFailed` if the device never checked in
/// - `CoreError::TargetNotFound` if no catalog target has the hash
/// - `CoreError::CampaignNotBound` if the campaign was created but binding it failed
/// - `CoreError::Backend` for any other backend failure
#[instrument(skip(backends, device), fields(device = %device.uuid))]
pub async fn apply_update(
    backends: &Backends,
    device: &Device,
    image_hash: &str,
) -> Result<UpdateApplied, CoreError> {
    let catalog = fetch_targets(&backends.repo).await?;
    let cur_image = require_image(&backends.director, device).await?;

    let (target_name, target) = find_by_hash(&catalog, image_hash)
        .ok_or_else(|| CoreError::TargetNotFound(image_hash.to_string()))?;

    let request = MultiTargetUpdate::single(&cur_image.hardware_id, target_name, target);
    let created: Value = backends
        .director
        .post(MULTI_TARGET_UPDATES_RESOURCE, &request)
        .await?;
    let update_id = update_id(created);

    if let Err(source) = backends
        .director
        .put::<Value>(&bind_resource(&device.uuid, &update_id))
        .await
    {
        error!(%update_id, error = %source, "campaign created but not bound to device");
        return Err(CoreError::CampaignNotBound {
            update_id,
            device: device.uuid.clone(),
            source,
        });
    }

    info!(%update_id, target = target_name, "update dispatched");
    Ok(UpdateApplied {
        cur_image,
        target_image: target.clone(),
    })
}
