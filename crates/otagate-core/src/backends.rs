//! Per-operation handles to the three backends

use otagate_client::BackendClient;

use crate::config::BackendsConfig;
use crate::error::CoreError;

/// Director, registry and repository clients for one tenant
///
/// Built fresh for each logical operation; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Backends {
    pub director: BackendClient,
    pub registry: BackendClient,
    pub repo: BackendClient,
}

impl Backends {
    /// Build clients for every backend in `config`
    ///
    /// # Errors
    /// Returns `CoreError::Config` if an endpoint is not a valid URL.
    pub fn connect(config: &BackendsConfig) -> Result<Self, CoreError> {
        let client = |name: &str, url: &str| {
            BackendClient::new(url, config.namespace.clone(), config.request.clone())
                .map_err(|e| CoreError::Config(format!("{name} endpoint {url:?}: {e}")))
        };

        Ok(Self {
            director: client("director", &config.director_url)?,
            registry: client("registry", &config.registry_url)?,
            repo: client("repository", &config.repository_url)?,
        })
    }
}
