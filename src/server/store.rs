use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::warn;

use crate::{
    config::{
        InstallationConfig, ManagedInstallation, Source, StoredRecord, properties,
        record::DEFAULT_JAR,
    },
    error::{Error, Result},
};

pub const RECORD_FILE: &str = "bot-config.json";

/// Filesystem-backed registry of installation records, one directory per name.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    base_dir: PathBuf,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        let base_dir = base_dir.into();
        let base_dir = std::path::absolute(&base_dir).unwrap_or(base_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn registry_dir(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.registry_dir(name).join(RECORD_FILE)
    }

    /// Writes `config` as the record for `name`, replacing any previous one.
    pub async fn write(&self, name: &str, config: &InstallationConfig) -> Result<()> {
        let dir = self.registry_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::fs_at("creating", &dir, e))?;

        let json = serde_json::to_vec_pretty(config).map_err(|e| {
            Error::fs(
                format!("serializing record for '{}'", name),
                std::io::Error::new(ErrorKind::InvalidData, e),
            )
        })?;

        let path = self.record_path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::fs_at("writing", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::fs_at("replacing", &path, e))?;

        Ok(())
    }

    /// Reads and completes the record for `name`.
    ///
    /// A missing record yields `None`; so does one that does not parse,
    /// since a directory without a valid record counts as unregistered.
    pub async fn read(&self, name: &str) -> Result<Option<InstallationConfig>> {
        let path = self.record_path(name);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::fs_at("reading", &path, e)),
        };

        match serde_json::from_slice::<StoredRecord>(&data) {
            Ok(raw) => Ok(Some(raw.complete(name, &self.registry_dir(name)))),
            Err(e) => {
                warn!(server = %name, path = %path.display(), error = %e, "ignoring malformed record");
                Ok(None)
            }
        }
    }

    pub async fn has_record(&self, name: &str) -> Result<bool> {
        Ok(self.read(name).await?.is_some())
    }

    /// Finds the installation behind `name`: its record if there is one,
    /// otherwise a legacy `server.jar` sitting directly in the registry
    /// directory.
    pub async fn resolve_managed(&self, name: &str) -> Result<Option<ManagedInstallation>> {
        if let Some(config) = self.read(name).await? {
            let artifact_exists = is_file(&config.jar_path()).await;
            return Ok(Some(ManagedInstallation {
                config,
                artifact_exists,
            }));
        }

        let dir = self.registry_dir(name);
        if !is_file(&dir.join(DEFAULT_JAR)).await {
            return Ok(None);
        }

        let props = properties::read_operational(&dir, name).await?;
        let config = StoredRecord {
            source: Some(Source::Legacy),
            port: Some(props.port),
            motd: Some(props.motd),
            ..StoredRecord::default()
        }
        .complete(name, &dir);

        Ok(Some(ManagedInstallation {
            config,
            artifact_exists: true,
        }))
    }
}

pub(crate) async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

pub(crate) async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
