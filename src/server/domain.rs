use std::{
    cmp::Ordering,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use tokio::fs;
use tracing::{info, warn};

use super::store::{ConfigStore, is_dir, is_file};
use crate::{
    config::{
        BuildId, InstallationConfig, ManagerSettings, ServerVariant, Source, VersionSpec,
        properties::{self, EULA_CONTENTS, EULA_FILE, PROPERTIES_FILE, ServerProperties},
        record::DEFAULT_JAR,
        validate,
    },
    error::{Error, Result, ValidationError},
    instance::{
        LaunchSettings, ProcessSupervisor, RunningInfo, StartedServer,
        StoppedServer, launch_args,
    },
    manifests::{BuildResolver, ResolvedBuild, UpstreamClient},
    utils::{shell_quote, tail_lines},
};

pub const LAUNCH_SCRIPT: &str = "start.sh";
pub const CONSOLE_LOG: &str = "logs/latest.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub name: String,
    pub variant: String,
    pub version: String,
    pub port: u32,
    pub memory_mb: u32,
    pub motd: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub name: String,
    pub source_path: PathBuf,
    pub jar_file: String,
    pub variant: String,
    pub version: String,
    pub memory_mb: u32,
}

/// One row of [`InstallationManager::list_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub source: Source,
    pub variant: ServerVariant,
    pub version: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    pub source: Source,
    pub variant: ServerVariant,
    pub version: String,
    pub build: Option<BuildId>,
    pub port: u16,
    pub memory_mb: u32,
    pub motd: String,
    pub server_path: PathBuf,
    pub jar_file: PathBuf,
    pub artifact_exists: bool,
    pub running: Option<RunningInfo>,
}

/// Entry point for the lifecycle of every managed server.
#[derive(Clone)]
pub struct InstallationManager {
    settings: ManagerSettings,
    store: ConfigStore,
    resolver: BuildResolver,
    upstream: Arc<dyn UpstreamClient>,
    supervisor: ProcessSupervisor,
}

impl InstallationManager {
    pub fn new(settings: ManagerSettings, upstream: Arc<dyn UpstreamClient>) -> Self {
        let store = ConfigStore::new(settings.base_dir.clone());
        let resolver = BuildResolver::new(upstream.clone(), settings.endpoints.clone());
        let supervisor = ProcessSupervisor::new(LaunchSettings::from(&settings));

        Self {
            settings,
            store,
            resolver,
            upstream,
            supervisor,
        }
    }

    #[cfg(feature = "http")]
    pub fn with_http(settings: ManagerSettings) -> Result<Self> {
        let upstream = crate::manifests::HttpUpstream::new(&settings.user_agent)?;
        Ok(Self::new(settings, Arc::new(upstream)))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Creates a fresh installation. Either everything is written or the
    /// registry directory is removed again.
    #[tracing::instrument(skip(self, request), fields(server = %request.name))]
    pub async fn create(&self, request: CreateRequest) -> Result<InstallationConfig> {
        let name = validate::name(&request.name)?.to_string();
        let variant: ServerVariant = request.variant.parse()?;
        if variant.strategy().is_none() {
            return Err(ValidationError::NotCreatable(variant.to_string()).into());
        }
        let spec: VersionSpec = request.version.parse()?;
        let port = validate::port(request.port)?;
        let memory_mb = validate::memory_mb(request.memory_mb)?;
        let motd = validate::motd_or_name(Some(&request.motd), &name);

        let base = self.store.base_dir();
        fs::create_dir_all(base)
            .await
            .map_err(|e| Error::fs_at("creating", base, e))?;

        let dir = self.store.registry_dir(&name);
        match fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyExists(name));
            }
            Err(e) => return Err(Error::fs_at("creating", &dir, e)),
        }

        info!(%variant, %spec, "creating server");
        let populated = self
            .populate(&name, &dir, variant, &spec, ServerProperties { port, motd }, memory_mb)
            .await;

        match populated {
            Ok(config) => {
                info!(version = %config.version, "server created");
                Ok(config)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir).await {
                    warn!(
                        dir = %dir.display(),
                        error = %cleanup,
                        "failed to clean up after aborted create"
                    );
                }
                Err(e)
            }
        }
    }

    async fn populate(
        &self,
        name: &str,
        dir: &Path,
        variant: ServerVariant,
        spec: &VersionSpec,
        props: ServerProperties,
        memory_mb: u32,
    ) -> Result<InstallationConfig> {
        let ResolvedBuild {
            version,
            build,
            artifact_url,
            ..
        } = self.resolver.resolve(variant, spec).await?;

        let jar_file = PathBuf::from(DEFAULT_JAR);
        let bytes = self
            .upstream
            .download(&artifact_url, &dir.join(&jar_file))
            .await?;
        info!(%artifact_url, bytes, "artifact downloaded");

        write_file(&dir.join(EULA_FILE), EULA_CONTENTS).await?;
        write_file(&dir.join(PROPERTIES_FILE), &properties::render(&props)).await?;

        let config = InstallationConfig {
            name: name.to_string(),
            source: Source::Created,
            server_path: dir.to_path_buf(),
            jar_file,
            variant,
            version,
            build,
            port: props.port,
            memory_mb,
            motd: props.motd,
            created_at: Some(Utc::now()),
        };
        self.store.write(name, &config).await?;

        self.write_launch_script(&config).await?;

        Ok(config)
    }

    async fn write_launch_script(&self, config: &InstallationConfig) -> Result<()> {
        let args = launch_args(
            &self.settings.jvm_args,
            config.memory_mb,
            &config.jar_file.to_string_lossy(),
        );
        let java = self.settings.java_bin.to_string_lossy().into_owned();
        let command: Vec<String> = std::iter::once(java)
            .chain(args)
            .map(|arg| shell_quote(&arg))
            .collect();
        let script = format!(
            "#!/bin/sh\ncd \"$(dirname \"$0\")\" || exit 1\nexec {}\n",
            command.join(" ")
        );

        let path = config.server_path.join(LAUNCH_SCRIPT);
        write_file(&path, &script).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| Error::fs_at("marking executable", &path, e))?;
        }

        Ok(())
    }

    /// Registers an existing server directory in place, without copying it.
    #[tracing::instrument(skip(self, request), fields(server = %request.name))]
    pub async fn import(&self, request: ImportRequest) -> Result<InstallationConfig> {
        let name = validate::name(&request.name)?.to_string();
        let variant: ServerVariant = request.variant.parse()?;
        let version = match request.version.parse::<VersionSpec>()? {
            VersionSpec::Exact(v) => v,
            VersionSpec::Latest => {
                return Err(ValidationError::InvalidVersion(request.version.clone()).into());
            }
        };
        let memory_mb = validate::memory_mb(request.memory_mb)?;
        let jar_file = validate::relative_jar(&request.jar_file)?.to_path_buf();

        if !is_dir(&request.source_path).await {
            return Err(
                ValidationError::NotADirectory(request.source_path.display().to_string()).into(),
            );
        }
        let server_path = fs::canonicalize(&request.source_path)
            .await
            .map_err(|e| Error::fs_at("resolving", &request.source_path, e))?;

        let jar_path = server_path.join(&jar_file);
        if !is_file(&jar_path).await {
            return Err(Error::NotFound(format!("server jar {}", jar_path.display())));
        }

        if self.store.has_record(&name).await? {
            return Err(Error::AlreadyManaged(name));
        }

        let registry_dir = self.store.registry_dir(&name);
        if is_dir(&registry_dir).await {
            let registered = fs::canonicalize(&registry_dir)
                .await
                .map_err(|e| Error::fs_at("resolving", &registry_dir, e))?;
            if registered != server_path {
                return Err(Error::AlreadyExists(name));
            }
        }

        let props = properties::read_operational(&server_path, &name).await?;

        let config = InstallationConfig {
            name: name.clone(),
            source: Source::Imported,
            server_path,
            jar_file,
            variant,
            version,
            build: None,
            port: props.port,
            memory_mb,
            motd: props.motd,
            created_at: Some(Utc::now()),
        };
        self.store.write(&name, &config).await?;

        info!(server_path = %config.server_path.display(), "server imported");
        Ok(config)
    }

    /// Every managed installation under the registry root, sorted by name
    /// ignoring case.
    pub async fn list_detailed(&self) -> Result<Vec<ServerSummary>> {
        let base = self.store.base_dir();
        let mut entries = match fs::read_dir(base).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::fs_at("listing", base, e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::fs_at("listing", base, e))?
        {
            // Follows symlinks, so a linked server directory is listed too.
            let is_directory = is_dir(&entry.path()).await;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_directory || !validate::is_valid_name(name) {
                continue;
            }

            let managed = match self.store.resolve_managed(name).await {
                Ok(Some(managed)) => managed,
                Ok(None) => continue,
                Err(e) => {
                    warn!(server = %name, error = %e, "skipping unreadable installation");
                    continue;
                }
            };

            summaries.push(ServerSummary {
                name: name.to_string(),
                source: managed.config.source,
                variant: managed.config.variant,
                version: managed.config.version,
                running: self.supervisor.is_running(name).await,
            });
        }

        summaries.sort_by(|a, b| compare_names(&a.name, &b.name));
        Ok(summaries)
    }

    pub async fn status(&self, name: &str) -> Result<ServerStatus> {
        validate::name(name)?;
        let managed = self
            .store
            .resolve_managed(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("server '{}'", name)))?;
        let config = managed.config;

        Ok(ServerStatus {
            name: config.name,
            source: config.source,
            variant: config.variant,
            version: config.version,
            build: config.build,
            port: config.port,
            memory_mb: config.memory_mb,
            motd: config.motd,
            server_path: config.server_path,
            jar_file: config.jar_file,
            artifact_exists: managed.artifact_exists,
            running: self.supervisor.info(name).await,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_server(
        &self,
        name: &str,
        memory_override: Option<u32>,
    ) -> Result<StartedServer> {
        validate::name(name)?;
        memory_override.map(validate::memory_mb).transpose()?;

        if self.supervisor.is_running(name).await {
            return Err(Error::AlreadyRunning(name.to_string()));
        }

        let managed = self
            .store
            .resolve_managed(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("server '{}'", name)))?;

        self.supervisor
            .start(name, &managed.config, memory_override)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_server(&self, name: &str) -> Result<StoppedServer> {
        validate::name(name)?;
        self.supervisor.stop(name).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn kill_server(&self, name: &str) -> Result<StoppedServer> {
        validate::name(name)?;
        self.supervisor.kill(name).await
    }

    pub async fn send_command(&self, name: &str, command: &str) -> Result<()> {
        validate::name(name)?;
        self.supervisor.send_command(name, command).await
    }

    /// Last `line_count` console lines: live while running, otherwise from
    /// the server's own `logs/latest.log`.
    pub async fn recent_logs(&self, name: &str, line_count: usize) -> Result<Vec<String>> {
        validate::name(name)?;

        if let Some(lines) = self.supervisor.log_tail(name, line_count).await {
            return Ok(lines);
        }

        let managed = self
            .store
            .resolve_managed(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("server '{}'", name)))?;

        let path = managed.config.server_path.join(CONSOLE_LOG);
        match fs::read(&path).await {
            Ok(bytes) => Ok(tail_lines(&String::from_utf8_lossy(&bytes), line_count)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::fs_at("reading", &path, e)),
        }
    }

    /// Names the supervisor is tracking, including ones without a record.
    pub async fn running(&self) -> Vec<String> {
        self.supervisor.running_names().await
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| Error::fs_at("writing", path, e))
}
