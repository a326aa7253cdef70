use serde::Deserialize;

use super::{ResolvedBuild, UpstreamClient, fetch, not_offered};
use crate::{
    config::{ServerVariant, VersionSpec},
    error::ResolutionError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaManifestV2 {
    pub latest: VanillaLatest,
    pub versions: Vec<VanillaManifestV2Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaLatest {
    pub release: String,
    #[serde(default)]
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaManifestV2Version {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaReleaseManifest {
    pub downloads: VanillaDownloads,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaDownloads {
    pub server: Option<VanillaArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VanillaArtifact {
    pub url: String,
}

impl VanillaManifestV2 {
    pub async fn load(
        client: &dyn UpstreamClient,
        url: &str,
    ) -> Result<Self, ResolutionError> {
        fetch(client, url).await
    }

    pub fn find(&self, id: &str) -> Option<&VanillaManifestV2Version> {
        self.versions.iter().find(|v| v.id == id)
    }
}

impl VanillaReleaseManifest {
    pub async fn load(
        client: &dyn UpstreamClient,
        entry: &VanillaManifestV2Version,
    ) -> Result<Self, ResolutionError> {
        fetch(client, &entry.url).await
    }

    pub fn server_url(&self, source: &str) -> Result<String, ResolutionError> {
        self.downloads
            .server
            .as_ref()
            .map(|s| s.url.clone())
            .ok_or_else(|| ResolutionError::Malformed {
                url: source.to_string(),
                message: "release has no server download".to_string(),
            })
    }
}

pub async fn resolve(
    client: &dyn UpstreamClient,
    manifest_url: &str,
    spec: &VersionSpec,
) -> Result<ResolvedBuild, ResolutionError> {
    let manifest = VanillaManifestV2::load(client, manifest_url).await?;

    let version = match spec {
        VersionSpec::Latest => manifest.latest.release.clone(),
        VersionSpec::Exact(v) => v.clone(),
    };

    let entry = manifest
        .find(&version)
        .ok_or_else(|| not_offered(ServerVariant::Vanilla, &version))?;

    let release = VanillaReleaseManifest::load(client, entry).await?;
    let artifact_url = release.server_url(&entry.url)?;

    Ok(ResolvedBuild {
        variant: ServerVariant::Vanilla,
        version,
        build: None,
        artifact_url,
    })
}
