//! Serialization guarantee: back-to-back tasks never overlap in subprocess
//! execution, and they run in strict arrival order.

#![cfg(unix)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jekyll_hook::HookConfig;
use jekyll_hook::config::{DEFAULT_SCRIPTS_KEY, EmailConfig, ScriptEntry};
use jekyll_hook::notifier::Notifier;
use jekyll_hook::pipeline::{Orchestrator, PipelineTask};
use jekyll_hook::scheduler::{PIPELINE_WORKERS, TaskScheduler};
use jekyll_hook::webhook::PushPayload;

/// A build script that logs its start and end around a sleep, so any overlap
/// between two tasks would show up as interleaved markers.
fn write_slow_script(dir: &Path, log: &Path) -> PathBuf {
    let path = dir.join("build.sh");
    fs::write(
        &path,
        format!(
            "#!/bin/sh\necho \"start $1\" >> {log}\nsleep 0.3\necho \"end $1\" >> {log}\n",
            log = log.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_noop_script(dir: &Path) -> PathBuf {
    let path = dir.join("publish.sh");
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn push_payload(repo: &str) -> PushPayload {
    serde_json::from_value(serde_json::json!({
        "ref": "refs/heads/master",
        "repository": { "name": repo, "owner": { "name": "allowed-org" } },
        "pusher": {}
    }))
    .unwrap()
}

#[test]
fn worker_concurrency_is_one() {
    assert_eq!(PIPELINE_WORKERS, 1);
}

#[tokio::test]
async fn back_to_back_tasks_run_in_order_without_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log");

    let build = write_slow_script(dir.path(), &log);
    let publish = write_noop_script(dir.path());

    let mut scripts = HashMap::new();
    scripts.insert(
        DEFAULT_SCRIPTS_KEY.to_string(),
        ScriptEntry {
            build: Some(build),
            publish: Some(publish),
        },
    );

    let config = Arc::new(HookConfig {
        listen: "127.0.0.1:0".to_string(),
        accounts: vec!["allowed-org".to_string()],
        secret: None,
        public_repo: true,
        gh_server: "github.com".to_string(),
        temp: dir.path().join("work"),
        email: EmailConfig::default(),
        scripts,
    });

    let orchestrator = Orchestrator::new(config, Notifier::disabled());
    let scheduler = TaskScheduler::start(orchestrator);

    assert!(scheduler.enqueue(PipelineTask::new(push_payload("alpha"), "master".to_string())));
    assert!(scheduler.enqueue(PipelineTask::new(push_payload("beta"), "master".to_string())));

    // Two tasks, four markers. Wait until both builds have finished.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let lines = fs::read_to_string(&log).unwrap_or_default();
        if lines.lines().count() >= 4 {
            break;
        }
        assert!(Instant::now() < deadline, "pipelines did not finish in time");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let lines: Vec<String> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();

    // Strict FIFO, no interleaving: the second build starts only after the
    // first task reached a terminal state.
    assert_eq!(lines, vec!["start alpha", "end alpha", "start beta", "end beta"]);

    // Wait for the trailing publish stage so pending drains to zero.
    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.pending() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(scheduler.pending(), 0);
}

/// A task that dies on a configuration error must not stall the queue.
#[tokio::test]
async fn fatal_task_error_does_not_stop_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log");

    let build = write_slow_script(dir.path(), &log);
    let publish = write_noop_script(dir.path());

    // Only master has scripts and there is no default entry.
    let mut scripts = HashMap::new();
    scripts.insert(
        "master".to_string(),
        ScriptEntry {
            build: Some(build),
            publish: Some(publish),
        },
    );

    let config = Arc::new(HookConfig {
        listen: "127.0.0.1:0".to_string(),
        accounts: vec!["allowed-org".to_string()],
        secret: None,
        public_repo: true,
        gh_server: "github.com".to_string(),
        temp: dir.path().join("work"),
        email: EmailConfig::default(),
        scripts,
    });

    let orchestrator = Orchestrator::new(config, Notifier::disabled());
    let scheduler = TaskScheduler::start(orchestrator);

    // First task: branch "develop" pushed to route "develop" resolves no
    // script at all, a fatal configuration error for that task.
    let doomed = serde_json::from_value::<PushPayload>(serde_json::json!({
        "ref": "refs/heads/develop",
        "repository": { "name": "alpha", "owner": { "name": "allowed-org" } },
        "pusher": {}
    }))
    .unwrap();
    assert!(scheduler.enqueue(PipelineTask::new(doomed, "develop".to_string())));

    // Second task is fine and must still run.
    assert!(scheduler.enqueue(PipelineTask::new(push_payload("beta"), "master".to_string())));

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let lines = fs::read_to_string(&log).unwrap_or_default();
        if lines.lines().count() >= 2 {
            break;
        }
        assert!(Instant::now() < deadline, "queue stalled after fatal task");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let lines: Vec<String> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    assert_eq!(lines, vec!["start beta", "end beta"]);
}
