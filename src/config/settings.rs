use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base URLs of the upstream build services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamEndpoints {
    pub vanilla_manifest: String,
    pub paper_api: String,
    pub purpur_api: String,
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            vanilla_manifest: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json"
                .to_string(),
            paper_api: "https://api.papermc.io/v2/projects/paper".to_string(),
            purpur_api: "https://api.purpurmc.org/v2/purpur".to_string(),
        }
    }
}

/// Runtime settings for an [`InstallationManager`](crate::InstallationManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerSettings {
    pub base_dir: PathBuf,
    pub java_bin: PathBuf,
    pub jvm_args: Vec<String>,
    pub stop_timeout_secs: u64,
    pub endpoints: UpstreamEndpoints,
    pub user_agent: String,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("servers"),
            java_bin: PathBuf::from("java"),
            jvm_args: Vec::new(),
            stop_timeout_secs: 15,
            endpoints: UpstreamEndpoints::default(),
            user_agent: concat!("craftkeeper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ManagerSettings {
    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::fs_at("reading settings", path, e))?;

        serde_json::from_slice(&data).map_err(|e| {
            Error::fs_at(
                "parsing settings",
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }
}
