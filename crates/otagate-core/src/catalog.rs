//! Signed target catalog reader

use otagate_api::{Catalog, SignedTargets, Target};
use otagate_client::BackendClient;
use tracing::{debug, instrument};

use crate::error::CoreError;

/// Repository resource holding the signed targets metadata
pub const TARGETS_RESOURCE: &str = "/api/v1/user_repo/targets.json";

/// Fetch the current catalog from the repository
///
/// Signatures are not checked here; devices verify metadata themselves when
/// they install an update.
///
/// # Errors
/// Returns `CoreError::Backend` if the repository is unreachable or the
/// document lacks the `signed.targets` envelope.
#[instrument(skip_all)]
pub async fn fetch_targets(repo: &BackendClient) -> Result<Catalog, CoreError> {
    let doc: SignedTargets = repo.get(TARGETS_RESOURCE).await?;
    debug!(count = doc.signed.targets.len(), "fetched target catalog");
    Ok(doc.signed.targets)
}

/// First target, in catalog order, whose sha256 equals `hash`
///
/// Linear scan; duplicate hashes resolve to the earliest entry.
#[must_use]
pub fn find_by_hash<'a>(catalog: &'a Catalog, hash: &str) -> Option<(&'a str, &'a Target)> {
    catalog
        .iter()
        .find(|(_, target)| target.sha256() == hash)
        .map(|(name, target)| (name.as_str(), target))
}
