use std::cmp::Ordering;

use serde::Deserialize;

use super::{ResolvedBuild, UpstreamClient, fetch, not_offered};
use crate::{
    config::{BuildId, ServerVariant, VersionSpec, compare_versions, max_version},
    error::ResolutionError,
};

pub const DEFAULT_CHANNEL: &str = "default";

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectVersions {
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildList {
    pub builds: Vec<BuildEntry>,
}

/// A build list entry; older endpoints return bare build numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BuildEntry {
    Bare(u64),
    Detailed {
        build: u64,
        #[serde(default)]
        channel: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBuild {
    pub build: u64,
    pub channel: String,
}

impl From<&BuildEntry> for ChannelBuild {
    fn from(entry: &BuildEntry) -> Self {
        match entry {
            BuildEntry::Bare(build) => ChannelBuild {
                build: *build,
                channel: DEFAULT_CHANNEL.to_string(),
            },
            BuildEntry::Detailed { build, channel } => ChannelBuild {
                build: *build,
                channel: channel
                    .as_deref()
                    .unwrap_or(DEFAULT_CHANNEL)
                    .to_ascii_lowercase(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildDetail {
    #[serde(default)]
    pub downloads: Option<BuildDownloads>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildDownloads {
    pub application: Option<BuildFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildFile {
    pub name: Option<String>,
}

impl BuildDetail {
    pub fn file_name(&self) -> Option<&str> {
        self.downloads
            .as_ref()?
            .application
            .as_ref()?
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
    }
}

/// Newest version: the last entry when upstream already lists versions in
/// ascending order, otherwise the comparator maximum.
pub fn latest_version(versions: &[String]) -> Option<&str> {
    let ascending = versions
        .windows(2)
        .all(|w| compare_versions(&w[0], &w[1]) != Ordering::Greater);

    if ascending {
        versions.last().map(String::as_str)
    } else {
        max_version(versions.iter().map(String::as_str))
    }
}

/// Highest build on the default channel, or across every channel when the
/// default channel has none.
pub fn pick_build(builds: &[ChannelBuild]) -> Option<u64> {
    let stable: Vec<&ChannelBuild> = builds
        .iter()
        .filter(|b| b.channel == DEFAULT_CHANNEL)
        .collect();

    let preferred: Vec<&ChannelBuild> = if stable.is_empty() {
        builds.iter().collect()
    } else {
        stable
    };

    preferred.iter().map(|b| b.build).max()
}

pub async fn resolve(
    client: &dyn UpstreamClient,
    project_url: &str,
    variant: ServerVariant,
    spec: &VersionSpec,
) -> Result<ResolvedBuild, ResolutionError> {
    let project: ProjectVersions = fetch(client, project_url).await?;

    let version = match spec {
        VersionSpec::Latest => latest_version(&project.versions)
            .ok_or_else(|| ResolutionError::Malformed {
                url: project_url.to_string(),
                message: "project lists no versions".to_string(),
            })?
            .to_string(),
        VersionSpec::Exact(v) => {
            if !project.versions.iter().any(|p| p == v) {
                return Err(not_offered(variant, v));
            }
            v.clone()
        }
    };

    let builds_url = format!("{}/versions/{}/builds", project_url, version);
    let list: BuildList = fetch(client, &builds_url).await?;
    let builds: Vec<ChannelBuild> = list.builds.iter().map(ChannelBuild::from).collect();

    let build = pick_build(&builds).ok_or_else(|| ResolutionError::NoBuilds {
        variant: variant.to_string(),
        version: version.clone(),
    })?;

    let detail_url = format!("{}/versions/{}/builds/{}", project_url, version, build);
    let detail: BuildDetail = fetch(client, &detail_url).await?;
    let file_name = detail.file_name().ok_or_else(|| ResolutionError::Malformed {
        url: detail_url.clone(),
        message: "build has no application download".to_string(),
    })?;

    let artifact_url = format!(
        "{}/versions/{}/builds/{}/downloads/{}",
        project_url, version, build, file_name
    );

    Ok(ResolvedBuild {
        variant,
        version,
        build: Some(BuildId::Number(build)),
        artifact_url,
    })
}
