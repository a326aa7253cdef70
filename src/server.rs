pub mod domain;
pub mod store;

pub use domain::{
    CONSOLE_LOG, CreateRequest, ImportRequest, InstallationManager, LAUNCH_SCRIPT, ServerStatus,
    ServerSummary,
};
pub use store::{ConfigStore, RECORD_FILE};
