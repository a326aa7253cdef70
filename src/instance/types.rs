use std::{path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};

use crate::config::ManagerSettings;

/// How the supervisor launches and stops the java runtime.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub java_bin: PathBuf,
    pub jvm_args: Vec<String>,
    pub stop_timeout: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self::from(&ManagerSettings::default())
    }
}

impl From<&ManagerSettings> for LaunchSettings {
    fn from(settings: &ManagerSettings) -> Self {
        Self {
            java_bin: settings.java_bin.clone(),
            jvm_args: settings.jvm_args.clone(),
            stop_timeout: settings.stop_timeout(),
        }
    }
}

/// Arguments following the runtime executable: extra JVM flags, heap size,
/// the jar, and `nogui`.
pub fn launch_args(jvm_args: &[String], memory_mb: u32, jar_file: &str) -> Vec<String> {
    let mut args = jvm_args.to_vec();
    args.push(format!("-Xms{}M", memory_mb));
    args.push(format!("-Xmx{}M", memory_mb));
    args.push("-jar".to_string());
    args.push(jar_file.to_string());
    args.push("nogui".to_string());
    args
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedServer {
    pub name: String,
    pub pid: u32,
    pub memory_mb: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedServer {
    pub name: String,
}

/// Read-only view of a tracked process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningInfo {
    pub pid: u32,
    pub memory_mb: u32,
    pub started_at: DateTime<Utc>,
}
