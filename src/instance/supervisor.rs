use std::{collections::HashMap, process::Stdio, sync::Arc};

use tokio::{
    process::{self, Child},
    sync::RwLock,
    time::timeout,
};
use tracing::{debug, error, info, warn};

use super::{
    handle::InstanceHandle,
    types::{LaunchSettings, RunningInfo, StartedServer, StoppedServer, launch_args},
};
use crate::{
    config::{InstallationConfig, validate},
    error::{Error, Result},
    server::store::is_file,
};

/// Owns every running server process, keyed by installation name.
///
/// An entry exists exactly while its process is alive and tracked: it is
/// inserted on a successful spawn and removed by the exit watcher.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    launch: Arc<LaunchSettings>,
    running: Arc<RwLock<HashMap<String, InstanceHandle>>>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(LaunchSettings::default())
    }
}

impl ProcessSupervisor {
    pub fn new(launch: LaunchSettings) -> Self {
        Self {
            launch: Arc::new(launch),
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn start(
        &self,
        name: &str,
        config: &InstallationConfig,
        memory_override: Option<u32>,
    ) -> Result<StartedServer> {
        let memory_mb = match memory_override {
            Some(m) => validate::memory_mb(m)?,
            None => config.memory_mb,
        };

        // Held across the spawn so two starts for one name cannot both succeed.
        let mut running = self.running.write().await;
        if running.contains_key(name) {
            return Err(Error::AlreadyRunning(name.to_string()));
        }

        let jar = config.jar_path();
        if !is_file(&jar).await {
            return Err(Error::NotFound(format!(
                "server jar {} for '{}'",
                jar.display(),
                name
            )));
        }

        let mut child = self
            .build_start_command(config, memory_mb)
            .spawn()
            .map_err(|e| {
                Error::fs(
                    format!("spawning {} for '{}'", self.launch.java_bin.display(), name),
                    e,
                )
            })?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let pid = child.id().unwrap_or_default();
        let handle = InstanceHandle::new(pid, memory_mb, stdin);
        handle.capture(stdout);
        handle.capture(stderr);

        running.insert(name.to_string(), handle.clone());
        drop(running);

        self.watch_exit(name.to_string(), handle, child);

        info!(server = %name, pid, memory_mb, "server process spawned");

        Ok(StartedServer {
            name: name.to_string(),
            pid,
            memory_mb,
        })
    }

    fn build_start_command(&self, config: &InstallationConfig, memory_mb: u32) -> process::Command {
        let jar = config.jar_file.to_string_lossy();
        let mut command = process::Command::new(&self.launch.java_bin);
        command
            .args(launch_args(&self.launch.jvm_args, memory_mb, &jar))
            .current_dir(&config.server_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::piped());

        #[cfg(unix)]
        command.process_group(0);
        command
    }

    fn watch_exit(&self, name: String, handle: InstanceHandle, mut child: Child) {
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut kill_sent = false;
            let outcome = loop {
                tokio::select! {
                    res = child.wait() => break res,
                    _ = handle.kill.cancelled(), if !kill_sent => {
                        kill_sent = true;
                        if let Err(e) = child.start_kill() {
                            warn!(server = %name, error = %e, "failed to signal process");
                        }
                    }
                }
            };

            let line = match outcome {
                Ok(status) => {
                    let code = status
                        .code()
                        .map_or_else(|| "null".to_string(), |c| c.to_string());
                    let signal = exit_signal(&status);
                    info!(server = %name, %code, %signal, "server process exited");
                    format!("[process exit] code={} signal={}", code, signal)
                }
                Err(e) => {
                    error!(server = %name, error = %e, "server process failed");
                    format!("[process error] {}", e)
                }
            };
            handle.append(&line).await;

            let mut map = running.write().await;
            if map.get(&name).is_some_and(|h| h.id == handle.id) {
                map.remove(&name);
            }
            drop(map);

            handle.exited.cancel();
        });
    }

    /// Sends `stop`, waits out the grace window, then kills if still alive.
    /// Returns once the tracking entry is gone.
    pub async fn stop(&self, name: &str) -> Result<StoppedServer> {
        let handle = self.handle(name).await?;

        if !handle.exited.is_cancelled() {
            debug!(server = %name, "sending stop command");
            if !handle.send_line("stop").await {
                warn!(server = %name, "stdin closed before stop command");
            }
        }

        let graceful = timeout(self.launch.stop_timeout, handle.exited.cancelled()).await;
        if graceful.is_err() && !handle.exited.is_cancelled() {
            warn!(
                server = %name,
                timeout_secs = self.launch.stop_timeout.as_secs(),
                "server ignored stop command, forcing termination"
            );
            handle.kill.cancel();
            handle.exited.cancelled().await;
        }

        info!(server = %name, "server stopped");
        Ok(StoppedServer {
            name: name.to_string(),
        })
    }

    /// Forced termination without the cooperative phase.
    pub async fn kill(&self, name: &str) -> Result<StoppedServer> {
        let handle = self.handle(name).await?;

        warn!(server = %name, "killing server process");
        handle.kill.cancel();
        handle.exited.cancelled().await;

        Ok(StoppedServer {
            name: name.to_string(),
        })
    }

    pub async fn send_command(&self, name: &str, command: &str) -> Result<()> {
        let handle = self.handle(name).await?;
        if handle.send_line(command).await {
            Ok(())
        } else {
            Err(Error::NotRunning(name.to_string()))
        }
    }

    pub async fn is_running(&self, name: &str) -> bool {
        self.running.read().await.contains_key(name)
    }

    pub async fn info(&self, name: &str) -> Option<RunningInfo> {
        self.running.read().await.get(name).map(InstanceHandle::info)
    }

    /// Most recent `n` captured lines, or `None` when `name` is not running.
    pub async fn log_tail(&self, name: &str, n: usize) -> Option<Vec<String>> {
        let logs = self.running.read().await.get(name)?.logs.clone();
        let buffer = logs.lock().await;
        Some(buffer.tail(n))
    }

    pub async fn running_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn handle(&self, name: &str) -> Result<InstanceHandle> {
        self.running
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotRunning(name.to_string()))
    }
}

fn missing_pipe(which: &str) -> Error {
    Error::fs(
        format!("attaching child {}", which),
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe not captured"),
    )
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    status
        .signal()
        .map_or_else(|| "null".to_string(), |s| s.to_string())
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> String {
    "null".to_string()
}
