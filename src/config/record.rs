use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ServerVariant,
    validate::{self, DEFAULT_MEMORY_MB, DEFAULT_PORT},
};

pub const DEFAULT_JAR: &str = "server.jar";
pub const UNKNOWN_VERSION: &str = "unknown";

/// Where a managed installation came from. Fixed once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Created,
    Imported,
    #[default]
    Legacy,
}

impl Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Created => write!(f, "created"),
            Source::Imported => write!(f, "imported"),
            Source::Legacy => write!(f, "legacy"),
        }
    }
}

/// Upstream build identifier: numeric for paper, textual for purpur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildId {
    Number(u64),
    Text(String),
}

impl Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildId::Number(n) => write!(f, "{}", n),
            BuildId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The `bot-config.json` record kept for every managed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationConfig {
    pub name: String,
    pub source: Source,
    pub server_path: PathBuf,
    pub jar_file: PathBuf,
    pub variant: ServerVariant,
    pub version: String,
    pub build: Option<BuildId>,
    pub port: u16,
    pub memory_mb: u32,
    pub motd: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl InstallationConfig {
    pub fn jar_path(&self) -> PathBuf {
        self.server_path.join(&self.jar_file)
    }
}

/// Record as found on disk; older shapes may lack any field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub name: Option<String>,
    pub source: Option<Source>,
    pub server_path: Option<PathBuf>,
    pub jar_file: Option<PathBuf>,
    pub variant: Option<ServerVariant>,
    pub version: Option<String>,
    pub build: Option<BuildId>,
    pub port: Option<u16>,
    pub memory_mb: Option<u32>,
    pub motd: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredRecord {
    /// Fills every absent field with its documented default.
    ///
    /// `registry_dir` anchors a missing or relative `serverPath`, and
    /// `dir_name` stands in for a missing `name`.
    pub fn complete(self, dir_name: &str, registry_dir: &Path) -> InstallationConfig {
        let name = self.name.unwrap_or_else(|| dir_name.to_string());

        let server_path = match self.server_path {
            Some(p) if p.is_absolute() => p,
            Some(p) => registry_dir.join(p),
            None => registry_dir.to_path_buf(),
        };

        let motd = validate::motd_or_name(self.motd.as_deref(), &name);

        InstallationConfig {
            source: self.source.unwrap_or_default(),
            server_path,
            jar_file: self.jar_file.unwrap_or_else(|| PathBuf::from(DEFAULT_JAR)),
            variant: self.variant.unwrap_or_default(),
            version: self.version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            build: self.build,
            port: self.port.unwrap_or(DEFAULT_PORT),
            memory_mb: self.memory_mb.unwrap_or(DEFAULT_MEMORY_MB),
            motd,
            created_at: self.created_at,
            name,
        }
    }
}

/// A resolved installation plus whether its artifact is on disk right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedInstallation {
    pub config: InstallationConfig,
    pub artifact_exists: bool,
}
