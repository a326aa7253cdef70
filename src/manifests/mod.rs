//! Upstream build discovery: turns a variant and version specifier into a
//! concrete downloadable server jar.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::{BuildId, ResolveStrategy, ServerVariant, UpstreamEndpoints, VersionSpec},
    error::{ResolutionError, Result},
};

#[cfg(feature = "http")]
mod http;
pub mod paper;
pub mod purpur;
pub mod vanilla;

#[cfg(feature = "http")]
pub use http::HttpUpstream;

/// Transport used to talk to the upstream build services.
///
/// Calls are single-attempt: a failure surfaces immediately.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn get_json(&self, url: &str) -> std::result::Result<Value, ResolutionError>;

    /// Streams `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// A concrete artifact chosen for a variant + version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    pub variant: ServerVariant,
    pub version: String,
    pub build: Option<BuildId>,
    pub artifact_url: String,
}

pub(crate) async fn fetch<T: DeserializeOwned>(
    client: &dyn UpstreamClient,
    url: &str,
) -> std::result::Result<T, ResolutionError> {
    let value = client.get_json(url).await?;
    serde_json::from_value(value).map_err(|e| ResolutionError::Malformed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn not_offered(variant: ServerVariant, version: &str) -> ResolutionError {
    ResolutionError::VersionNotOffered {
        variant: variant.to_string(),
        version: version.to_string(),
    }
}

#[derive(Clone)]
pub struct BuildResolver {
    client: Arc<dyn UpstreamClient>,
    endpoints: UpstreamEndpoints,
}

impl BuildResolver {
    pub fn new(client: Arc<dyn UpstreamClient>, endpoints: UpstreamEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub async fn resolve(
        &self,
        variant: ServerVariant,
        spec: &VersionSpec,
    ) -> std::result::Result<ResolvedBuild, ResolutionError> {
        let strategy = variant
            .strategy()
            .ok_or_else(|| ResolutionError::Unsupported(variant.to_string()))?;

        debug!(%variant, %spec, ?strategy, "resolving build");

        let client = self.client.as_ref();
        match strategy {
            ResolveStrategy::DirectManifest => {
                vanilla::resolve(client, &self.endpoints.vanilla_manifest, spec).await
            }
            ResolveStrategy::ChannelFiltered => {
                paper::resolve(client, &self.endpoints.paper_api, variant, spec).await
            }
            ResolveStrategy::CurrentPointer => {
                purpur::resolve(client, &self.endpoints.purpur_api, variant, spec).await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::{collections::HashMap, path::Path};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::UpstreamClient;
    use crate::error::{ResolutionError, Result};

    /// Serves canned JSON by URL; unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubUpstream {
        pub routes: HashMap<String, Value>,
    }

    impl StubUpstream {
        pub fn route(mut self, url: &str, body: Value) -> Self {
            self.routes.insert(url.to_string(), body);
            self
        }
    }

    #[async_trait]
    impl UpstreamClient for StubUpstream {
        async fn get_json(&self, url: &str) -> std::result::Result<Value, ResolutionError> {
            self.routes
                .get(url)
                .cloned()
                .ok_or_else(|| ResolutionError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }

        async fn download(&self, _url: &str, dest: &Path) -> Result<u64> {
            tokio::fs::write(dest, b"jar").await.map_err(|e| {
                crate::error::Error::fs_at("writing", dest, e)
            })?;
            Ok(3)
        }
    }
}
