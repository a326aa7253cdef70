use serde::Deserialize;

use super::{ResolvedBuild, UpstreamClient, fetch, not_offered};
use crate::{
    config::{BuildId, ServerVariant, VersionSpec},
    error::ResolutionError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct PurpurProject {
    pub versions: Vec<String>,
    #[serde(default)]
    pub metadata: Option<PurpurMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurpurMetadata {
    pub current: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurpurVersion {
    pub builds: PurpurBuilds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurpurBuilds {
    pub latest: Option<String>,
}

pub async fn resolve(
    client: &dyn UpstreamClient,
    project_url: &str,
    variant: ServerVariant,
    spec: &VersionSpec,
) -> Result<ResolvedBuild, ResolutionError> {
    let project: PurpurProject = fetch(client, project_url).await?;

    let version = match spec {
        VersionSpec::Latest => project
            .metadata
            .and_then(|m| m.current)
            .ok_or_else(|| ResolutionError::Malformed {
                url: project_url.to_string(),
                message: "project has no current version".to_string(),
            })?,
        VersionSpec::Exact(v) => {
            if !project.versions.iter().any(|p| p == v) {
                return Err(not_offered(variant, v));
            }
            v.clone()
        }
    };

    let version_url = format!("{}/{}", project_url, version);
    let meta: PurpurVersion = fetch(client, &version_url).await?;
    let build = meta
        .builds
        .latest
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ResolutionError::NoBuilds {
            variant: variant.to_string(),
            version: version.clone(),
        })?;

    let artifact_url = format!("{}/{}/{}/download", project_url, version, build);

    Ok(ResolvedBuild {
        variant,
        version,
        build: Some(BuildId::Text(build)),
        artifact_url,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::manifests::stub::StubUpstream;

    const PROJECT: &str = "http://purpur.test/v2/purpur";

    fn upstream() -> StubUpstream {
        StubUpstream::default()
            .route(
                PROJECT,
                json!({
                    "project": "purpur",
                    "metadata": {"current": "1.21.1"},
                    "versions": ["1.20.4", "1.21.1"]
                }),
            )
            .route(
                &format!("{PROJECT}/1.21.1"),
                json!({"builds": {"all": ["2299", "2300"], "latest": "2300"}}),
            )
            .route(&format!("{PROJECT}/1.20.4"), json!({"builds": {"all": []}}))
    }

    #[tokio::test]
    async fn latest_uses_current_pointer() {
        let build = resolve(&upstream(), PROJECT, ServerVariant::Purpur, &VersionSpec::Latest)
            .await
            .unwrap();
        assert_eq!(build.version, "1.21.1");
        assert_eq!(build.build, Some(BuildId::Text("2300".into())));
        assert_eq!(build.artifact_url, format!("{PROJECT}/1.21.1/2300/download"));
    }

    #[tokio::test]
    async fn exact_version_must_be_listed() {
        let err = resolve(
            &upstream(),
            PROJECT,
            ServerVariant::Purpur,
            &VersionSpec::Exact("1.12.2".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolutionError::VersionNotOffered { .. }));
    }

    #[tokio::test]
    async fn missing_latest_build_fails() {
        let err = resolve(
            &upstream(),
            PROJECT,
            ServerVariant::Purpur,
            &VersionSpec::Exact("1.20.4".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolutionError::NoBuilds { .. }));
    }
}
