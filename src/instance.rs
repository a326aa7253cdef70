mod handle;
pub mod log;
mod supervisor;
pub mod types;

pub use log::{LOG_CAPACITY, LogBuffer};
pub use supervisor::ProcessSupervisor;
pub use types::{LaunchSettings, RunningInfo, StartedServer, StoppedServer, launch_args};
