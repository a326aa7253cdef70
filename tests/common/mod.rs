#![allow(dead_code)]

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use craftkeeper::{
    Error, InstallationManager, ManagerSettings, ProcessSupervisor, ResolutionError,
    UpstreamClient, UpstreamEndpoints,
};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const MANIFEST_URL: &str = "http://stub.test/mc/version_manifest_v2.json";

/// Replies only when a line equal to `stop` arrives on stdin.
pub const COOPERATIVE_SERVER: &str = r#"echo "Starting minecraft server"
while read -r line; do
  if [ "$line" = "stop" ]; then
    echo "Stopping the server"
    exit 0
  fi
  echo "echo: $line"
done
"#;

/// Never reads stdin; only a kill ends it.
pub const STUBBORN_SERVER: &str = r#"echo "not listening"
exec sleep 600
"#;

pub const SHORT_LIVED_SERVER: &str = r#"echo "bye"
exit 3
"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Upstream that serves canned JSON and a fixed artifact.
#[derive(Default)]
pub struct StubUpstream {
    routes: HashMap<String, Value>,
    artifact: Option<Vec<u8>>,
}

impl StubUpstream {
    pub fn route(mut self, url: &str, body: Value) -> Self {
        self.routes.insert(url.to_string(), body);
        self
    }

    pub fn artifact(mut self, bytes: &[u8]) -> Self {
        self.artifact = Some(bytes.to_vec());
        self
    }

    /// Vanilla manifest whose latest release is 1.21.1.
    pub fn vanilla() -> Self {
        Self::default()
            .route(
                MANIFEST_URL,
                json!({
                    "latest": {"release": "1.21.1", "snapshot": "24w33a"},
                    "versions": [
                        {"id": "1.21.1", "type": "release", "url": "http://stub.test/1.21.1.json"},
                        {"id": "1.20.4", "type": "release", "url": "http://stub.test/1.20.4.json"}
                    ]
                }),
            )
            .route(
                "http://stub.test/1.21.1.json",
                json!({"downloads": {"server": {"url": "http://stub.test/server-1.21.1.jar"}}}),
            )
            .route(
                "http://stub.test/1.20.4.json",
                json!({"downloads": {"server": {"url": "http://stub.test/server-1.20.4.jar"}}}),
            )
    }
}

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn get_json(&self, url: &str) -> Result<Value, ResolutionError> {
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| ResolutionError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn download(&self, url: &str, dest: &Path) -> craftkeeper::Result<u64> {
        let Some(bytes) = &self.artifact else {
            return Err(ResolutionError::Status {
                url: url.to_string(),
                status: 503,
            }
            .into());
        };

        tokio::fs::write(dest, bytes)
            .await
            .map_err(|e| Error::fs_at("writing", dest, e))?;
        Ok(bytes.len() as u64)
    }
}

/// Settings rooted in `dir` that launch `/bin/sh <script>` in place of java.
pub fn settings(dir: &TempDir, script: Option<&Path>) -> ManagerSettings {
    let mut settings = ManagerSettings::with_base_dir(dir.path().join("servers"));
    settings.endpoints = UpstreamEndpoints {
        vanilla_manifest: MANIFEST_URL.to_string(),
        ..UpstreamEndpoints::default()
    };
    settings.stop_timeout_secs = 1;
    if let Some(script) = script {
        settings.java_bin = "/bin/sh".into();
        settings.jvm_args = vec![script.display().to_string()];
    }
    settings
}

pub fn write_script(dir: &TempDir, file: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, body).unwrap();
    path
}

pub fn manager(dir: &TempDir, upstream: StubUpstream, script: Option<&Path>) -> InstallationManager {
    InstallationManager::new(settings(dir, script), Arc::new(upstream))
}

pub async fn wait_for_log(supervisor: &ProcessSupervisor, name: &str, needle: &str) -> bool {
    for _ in 0..100 {
        if let Some(lines) = supervisor.log_tail(name, 500).await {
            if lines.iter().any(|l| l.contains(needle)) {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

pub async fn wait_until_gone(supervisor: &ProcessSupervisor, name: &str) -> bool {
    for _ in 0..100 {
        if !supervisor.is_running(name).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
