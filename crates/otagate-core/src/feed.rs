//! Targets a device can move to, newest first

use std::cmp::Reverse;

use otagate_api::{Catalog, Device, EcuImage, Target};
use tracing::instrument;

use crate::backends::Backends;
use crate::catalog::fetch_targets;
use crate::devices::current_image;
use crate::error::CoreError;

/// Update feed for `device`
///
/// Empty for a device that never checked in.
///
/// # Errors
/// Returns `CoreError::Backend` if the director or repository fails.
#[instrument(skip_all, fields(device = %device.uuid))]
pub async fn list_updates(backends: &Backends, device: &Device) -> Result<Vec<Target>, CoreError> {
    let Some(image) = current_image(&backends.director, device).await? else {
        return Ok(Vec::new());
    };
    let catalog = fetch_targets(&backends.repo).await?;
    Ok(compatible_targets(catalog, &image))
}

/// Targets installable on `image`'s hardware, the installed one marked active
///
/// Sorted by `updatedAt` descending; ties and undated targets keep catalog order,
/// undated ones last.
#[must_use]
pub fn compatible_targets(catalog: Catalog, image: &EcuImage) -> Vec<Target> {
    let mut marked = false;
    let mut targets: Vec<Target> = catalog
        .into_values()
        .filter(|target| target.supports(&image.hardware_id))
        .map(|mut target| {
            // duplicate hashes: only the first in catalog order is active
            target.active = !marked && target.sha256() == image.sha256();
            marked |= target.active;
            target
        })
        .collect();

    targets.sort_by_key(|target| Reverse(target.custom.updated_at));
    targets
}
