use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter},
    process::ChildStdin,
    sync::{Mutex, mpsc},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{log::LogBuffer, types::RunningInfo};

const READ_CHUNK: usize = 8 * 1024;
/// Longest single console line kept before it is split.
pub(crate) const MAX_LINE_BYTES: usize = 16 * 1024;

/// Tracking entry for one running server process.
///
/// Clones share the same log buffer, stdin channel and tokens.
#[derive(Debug, Clone)]
pub struct InstanceHandle {
    pub id: Uuid,
    pub pid: u32,
    pub memory_mb: u32,
    pub started_at: DateTime<Utc>,
    pub logs: Arc<Mutex<LogBuffer>>,
    stdin_tx: mpsc::Sender<String>,
    /// Cancelled by the exit watcher once the process is gone and untracked.
    pub exited: CancellationToken,
    /// Cancelled to request a forced termination.
    pub kill: CancellationToken,
}

impl InstanceHandle {
    pub fn new(pid: u32, memory_mb: u32, stdin: ChildStdin) -> Self {
        let (stdin_tx, stdin_rx) = mpsc::channel(64);
        let exited = CancellationToken::new();

        spawn_stdin_pump(stdin, stdin_rx, exited.clone());

        Self {
            id: Uuid::new_v4(),
            pid,
            memory_mb,
            started_at: Utc::now(),
            logs: Arc::new(Mutex::new(LogBuffer::default())),
            stdin_tx,
            exited,
            kill: CancellationToken::new(),
        }
    }

    pub fn info(&self) -> RunningInfo {
        RunningInfo {
            pid: self.pid,
            memory_mb: self.memory_mb,
            started_at: self.started_at,
        }
    }

    /// Queues one console line for the process; returns false once stdin is closed.
    pub async fn send_line<S: Into<String>>(&self, cmd: S) -> bool {
        let mut command = cmd.into();
        if !command.ends_with('\n') {
            command.push('\n');
        }

        self.stdin_tx.send(command).await.is_ok()
    }

    pub async fn append(&self, chunk: &str) {
        self.logs.lock().await.push_chunk(chunk, Utc::now());
    }

    /// Copies `reader` into the log buffer until EOF.
    pub fn capture<R>(&self, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let logs = self.logs.clone();
        tokio::spawn(async move {
            let mut reader = reader;
            let mut lines = LineAssembler::default();
            let mut buf = [0u8; READ_CHUNK];

            loop {
                match reader.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let complete = lines.feed(&buf[..n]);
                        if !complete.is_empty() {
                            let mut logs = logs.lock().await;
                            for line in complete {
                                logs.push_chunk(&line, Utc::now());
                            }
                        }
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                logs.lock().await.push_chunk(&rest, Utc::now());
            }
        });
    }
}

/// Reassembles newline-terminated lines from arbitrary read chunks.
///
/// A line that grows past [`MAX_LINE_BYTES`] without a newline is emitted
/// as is and the remainder starts a new line.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                out.push(self.take());
                continue;
            }
            self.pending.push(byte);
            if self.pending.len() >= MAX_LINE_BYTES {
                out.push(self.take());
            }
        }
        out
    }

    pub(crate) fn finish(&mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| self.take())
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

fn spawn_stdin_pump(
    stdin: ChildStdin,
    mut stdin_rx: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut writer = BufWriter::new(stdin);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                maybe_cmd = stdin_rx.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        break;
                    };
                    if writer.write_all(cmd.as_bytes()).await.is_err()
                        || writer.flush().await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    });
}
