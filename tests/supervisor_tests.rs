#![cfg(unix)]

mod common;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use common::{
    COOPERATIVE_SERVER, SHORT_LIVED_SERVER, STUBBORN_SERVER, wait_for_log, wait_until_gone,
};
use craftkeeper::{
    Error, InstallationConfig, ProcessSupervisor, ServerVariant, Source,
    instance::LaunchSettings,
};
use tempfile::TempDir;

fn supervisor(dir: &TempDir, body: &str, stop_timeout: Duration) -> ProcessSupervisor {
    let script = common::write_script(dir, "fake-java.sh", body);
    ProcessSupervisor::new(LaunchSettings {
        java_bin: "/bin/sh".into(),
        jvm_args: vec![script.display().to_string()],
        stop_timeout,
    })
}

fn installation(dir: &TempDir, name: &str) -> InstallationConfig {
    let server_path = dir.path().join(name);
    std::fs::create_dir_all(&server_path).unwrap();
    std::fs::write(server_path.join("server.jar"), b"jar").unwrap();

    InstallationConfig {
        name: name.to_string(),
        source: Source::Created,
        server_path,
        jar_file: PathBuf::from("server.jar"),
        variant: ServerVariant::Vanilla,
        version: "1.21.1".to_string(),
        build: None,
        port: 25565,
        memory_mb: 2048,
        motd: name.to_string(),
        created_at: None,
    }
}

#[tokio::test]
async fn second_start_fails_and_leaves_first_entry() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));
    let config = installation(&dir, "alpha");

    let first = sup.start("alpha", &config, None).await.unwrap();
    assert!(first.pid > 0);
    assert_eq!(first.memory_mb, 2048);

    let err = sup.start("alpha", &config, Some(1024)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning(ref n) if n == "alpha"));

    let info = sup.info("alpha").await.unwrap();
    assert_eq!(info.pid, first.pid);
    assert_eq!(info.memory_mb, 2048);

    sup.stop("alpha").await.unwrap();
}

#[tokio::test]
async fn stopping_an_unknown_server_fails() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));

    let err = sup.stop("never").await.unwrap_err();
    assert!(matches!(err, Error::NotRunning(_)));
    let err = sup.kill("never").await.unwrap_err();
    assert!(matches!(err, Error::NotRunning(_)));
}

#[tokio::test]
async fn cooperative_stop_returns_before_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(15));
    let config = installation(&dir, "coop");

    sup.start("coop", &config, Some(1024)).await.unwrap();
    assert!(wait_for_log(&sup, "coop", "Starting minecraft server").await);

    let started = Instant::now();
    let stopped = sup.stop("coop").await.unwrap();
    assert_eq!(stopped.name, "coop");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!sup.is_running("coop").await);
    assert!(sup.log_tail("coop", 10).await.is_none());
}

#[tokio::test]
async fn unresponsive_server_is_killed_after_grace_window() {
    let dir = tempfile::tempdir().unwrap();
    let grace = Duration::from_millis(500);
    let sup = supervisor(&dir, STUBBORN_SERVER, grace);
    let config = installation(&dir, "stubborn");

    sup.start("stubborn", &config, None).await.unwrap();
    assert!(wait_for_log(&sup, "stubborn", "not listening").await);

    let started = Instant::now();
    sup.stop("stubborn").await.unwrap();
    assert!(started.elapsed() >= grace);
    assert!(!sup.is_running("stubborn").await);
}

#[tokio::test]
async fn output_is_captured_with_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));
    let config = installation(&dir, "chatty");

    sup.start("chatty", &config, None).await.unwrap();
    sup.send_command("chatty", "say hello").await.unwrap();
    assert!(wait_for_log(&sup, "chatty", "echo: say hello").await);

    let lines = sup.log_tail("chatty", 500).await.unwrap();
    assert!(lines.iter().all(|l| l.starts_with('[')));
    assert_eq!(sup.log_tail("chatty", 1).await.unwrap().len(), 1);

    sup.stop("chatty").await.unwrap();
}

#[tokio::test]
async fn exited_process_is_untracked() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, SHORT_LIVED_SERVER, Duration::from_secs(5));
    let config = installation(&dir, "brief");

    sup.start("brief", &config, None).await.unwrap();
    assert!(wait_until_gone(&sup, "brief").await);
    assert!(sup.running_names().await.is_empty());

    let err = sup.stop("brief").await.unwrap_err();
    assert!(matches!(err, Error::NotRunning(_)));

    // A fresh start is allowed once the previous process is gone.
    sup.start("brief", &config, None).await.unwrap();
    assert!(wait_until_gone(&sup, "brief").await);
}

#[tokio::test]
async fn kill_skips_the_grace_window() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, STUBBORN_SERVER, Duration::from_secs(30));
    let config = installation(&dir, "victim");

    sup.start("victim", &config, None).await.unwrap();
    let started = Instant::now();
    sup.kill("victim").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!sup.is_running("victim").await);
}

#[tokio::test]
async fn missing_jar_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));
    let mut config = installation(&dir, "nojar");
    config.jar_file = PathBuf::from("missing.jar");

    let err = sup.start("nojar", &config, None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!sup.is_running("nojar").await);
}

#[tokio::test]
async fn memory_override_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));
    let config = installation(&dir, "mem");

    let err = sup.start("mem", &config, Some(128)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!sup.is_running("mem").await);

    let started = sup.start("mem", &config, Some(4096)).await.unwrap();
    assert_eq!(started.memory_mb, 4096);
    sup.stop("mem").await.unwrap();
}

#[tokio::test]
async fn spawn_failure_creates_no_entry() {
    let dir = tempfile::tempdir().unwrap();
    let sup = ProcessSupervisor::new(LaunchSettings {
        java_bin: dir.path().join("no-such-java"),
        jvm_args: Vec::new(),
        stop_timeout: Duration::from_secs(1),
    });
    let config = installation(&dir, "nojava");

    let err = sup.start("nojava", &config, None).await.unwrap_err();
    assert!(matches!(err, Error::Filesystem { .. }));
    assert!(!sup.is_running("nojava").await);
}

#[tokio::test]
async fn concurrent_starts_track_one_process() {
    let dir = tempfile::tempdir().unwrap();
    let sup = supervisor(&dir, COOPERATIVE_SERVER, Duration::from_secs(5));
    let config = installation(&dir, "alpha");

    let (a, b) = tokio::join!(
        sup.start("alpha", &config, None),
        sup.start("alpha", &config, None)
    );

    let (started, err) = match (a, b) {
        (Ok(s), Err(e)) | (Err(e), Ok(s)) => (s, e),
        (a, b) => panic!("expected exactly one start to succeed: {a:?} / {b:?}"),
    };
    assert!(matches!(err, Error::AlreadyRunning(ref n) if n == "alpha"));
    assert_eq!(sup.running_names().await, vec!["alpha".to_string()]);
    assert_eq!(sup.info("alpha").await.map(|i| i.pid), Some(started.pid));

    sup.stop("alpha").await.unwrap();
}
