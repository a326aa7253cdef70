//! Registry and process lifecycle manager for locally hosted Minecraft
//! servers.
//!
//! [`InstallationManager`] is the whole public surface a front-end needs:
//! `create`, `import`, `start_server` and `stop_server` mutate, while
//! `list_detailed`, `status` and `recent_logs` only read. Installations live
//! one per directory under a registry root, each described by a
//! `bot-config.json` record; running processes are tracked in memory only.
//!
//! ```no_run
//! use craftkeeper::{CreateRequest, InstallationManager, ManagerSettings};
//!
//! # async fn run() -> craftkeeper::Result<()> {
//! let manager = InstallationManager::with_http(ManagerSettings::with_base_dir("/srv/minecraft"))?;
//!
//! manager
//!     .create(CreateRequest {
//!         name: "survival".into(),
//!         variant: "paper".into(),
//!         version: "latest".into(),
//!         port: 25565,
//!         memory_mb: 4096,
//!         motd: "Survival".into(),
//!     })
//!     .await?;
//!
//! let started = manager.start_server("survival", None).await?;
//! println!("pid {}", started.pid);
//!
//! for line in manager.recent_logs("survival", 20).await? {
//!     println!("{line}");
//! }
//!
//! manager.stop_server("survival").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod instance;
pub mod manifests;
pub mod server;
pub mod utils;

pub use config::{
    BuildId, InstallationConfig, ManagedInstallation, ManagerSettings, ServerVariant, Source,
    UpstreamEndpoints, VersionSpec, compare_versions,
};
pub use error::{Error, ResolutionError, Result, ValidationError};
pub use instance::{ProcessSupervisor, RunningInfo, StartedServer, StoppedServer};
#[cfg(feature = "http")]
pub use manifests::HttpUpstream;
pub use manifests::{BuildResolver, ResolvedBuild, UpstreamClient};
pub use server::{
    ConfigStore, CreateRequest, ImportRequest, InstallationManager, ServerStatus, ServerSummary,
};
