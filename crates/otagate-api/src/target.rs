//! Signed target catalog types served by the repository

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Targets keyed by target name, in catalog document order
pub type Catalog = IndexMap<String, Target>;

/// `targets.json` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SignedTargets {
    pub signed: TargetsRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetsRole {
    pub targets: Catalog,
}

/// A distributable image variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Target {
    pub hashes: Hashes,
    /// Image size in bytes
    pub length: u64,
    pub custom: TargetCustom,
    /// Set on the entry matching the device's installed image when building an update feed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,
}

impl Target {
    /// Whether an ECU with this hardware id can install the target
    #[must_use]
    pub fn supports(&self, hardware_id: &str) -> bool {
        self.custom.hardware_ids.iter().any(|id| id == hardware_id)
    }

    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.hashes.sha256
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Hashes {
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

/// Repository metadata attached to a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetCustom {
    /// Subscription name used for auto-updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Hardware ids able to install this target
    #[serde(default)]
    pub hardware_ids: Vec<String>,
    /// Image format (`OSTREE`, `BINARY`)
    #[serde(default)]
    pub target_format: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: BTreeMap<String, Value>,
}

/// Malformed or non-string timestamps read as absent so one bad entry cannot
/// make the whole catalog undecodable
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|text| text.parse::<DateTime<Utc>>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_keeps_document_order() {
        let raw = r#"{
            "signed": {
                "_type": "Targets",
                "targets": {
                    "raspberrypi3-64-lmp-2": {
                        "hashes": { "sha256": "h2" },
                        "length": 10,
                        "custom": { "hardwareIds": ["raspberrypi3-64"], "targetFormat": "OSTREE" }
                    },
                    "raspberrypi3-64-lmp-1": {
                        "hashes": { "sha256": "h1" },
                        "length": 10,
                        "custom": { "hardwareIds": ["raspberrypi3-64"], "targetFormat": "OSTREE" }
                    }
                }
            }
        }"#;

        let doc: SignedTargets = serde_json::from_str(raw).unwrap();
        let names: Vec<&str> = doc.signed.targets.keys().map(String::as_str).collect();
        assert_eq!(names, ["raspberrypi3-64-lmp-2", "raspberrypi3-64-lmp-1"]);
    }

    #[test]
    fn test_target_supports_hardware_id() {
        let target: Target = serde_json::from_value(json!({
            "hashes": { "sha256": "h1" },
            "length": 1,
            "custom": { "hardwareIds": ["hw1", "hw2"] }
        }))
        .unwrap();

        assert!(target.supports("hw2"));
        assert!(!target.supports("hw3"));
        assert!(!target.active);
    }

    #[test]
    fn test_bad_timestamps_do_not_reject_catalog() {
        let raw = r#"{
            "signed": {
                "targets": {
                    "lmp-2": {
                        "hashes": { "sha256": "h2" },
                        "length": 1,
                        "custom": {
                            "hardwareIds": ["hw1"],
                            "createdAt": "yesterday",
                            "updatedAt": 42
                        }
                    },
                    "lmp-1": {
                        "hashes": { "sha256": "h1" },
                        "length": 1,
                        "custom": { "hardwareIds": ["hw1"], "updatedAt": "2018-10-12T15:30:00Z" }
                    }
                }
            }
        }"#;

        let doc: SignedTargets = serde_json::from_str(raw).unwrap();
        let broken = &doc.signed.targets["lmp-2"].custom;
        assert!(broken.created_at.is_none());
        assert!(broken.updated_at.is_none());
        let dated = doc.signed.targets["lmp-1"].custom.updated_at.unwrap();
        assert_eq!(dated.to_rfc3339(), "2018-10-12T15:30:00+00:00");
    }

    #[test]
    fn test_active_flag_only_serialized_when_set() {
        let mut target: Target = serde_json::from_value(json!({
            "hashes": { "sha256": "h1" },
            "length": 1,
            "custom": { "hardwareIds": ["hw1"], "uri": "https://example.com/h1" }
        }))
        .unwrap();

        let value = serde_json::to_value(&target).unwrap();
        assert!(value.get("active").is_none());
        assert_eq!(value["custom"]["uri"], "https://example.com/h1");

        target.active = true;
        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["active"], true);
    }
}
