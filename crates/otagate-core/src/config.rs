//! Backend endpoints and tenant settings

use serde::{Deserialize, Serialize};

pub use otagate_client::RequestConfig;

/// Where the director, registry and repository live, and which tenant to act as
///
/// Built once at startup and handed to [`crate::OtaService`]; business logic
/// never reads endpoints from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Tenant namespace sent with every backend call
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Director base URL
    #[serde(default = "default_director_url")]
    pub director_url: String,
    /// Device registry base URL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// TUF repository base URL
    #[serde(default = "default_repository_url")]
    pub repository_url: String,
    /// Timeout and retry policy
    #[serde(default)]
    pub request: RequestConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            director_url: default_director_url(),
            registry_url: default_registry_url(),
            repository_url: default_repository_url(),
            request: RequestConfig::default(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_director_url() -> String {
    "http://director".to_string()
}

fn default_registry_url() -> String {
    "http://device-registry".to_string()
}

fn default_repository_url() -> String {
    "http://tuf-reposerver".to_string()
}
