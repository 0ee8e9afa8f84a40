use async_trait::async_trait;
use stackdeck_compose::{
    CliRunner, ComposeClient, ComposeError, ComposeMode, ComposeRunner, ComposeTimeouts, Result,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 呼び出しを記録し、固定の出力を返すランナー
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<(PathBuf, Vec<String>, Duration)>>,
    output: String,
    fail: bool,
}

#[async_trait]
impl ComposeRunner for RecordingRunner {
    async fn run(&self, dir: &Path, args: &[&str], timeout: Duration) -> Result<String> {
        self.calls.lock().unwrap().push((
            dir.to_path_buf(),
            args.iter().map(|a| a.to_string()).collect(),
            timeout,
        ));
        if self.fail {
            return Err(ComposeError::CommandFailed {
                command: format!("docker compose {}", args.join(" ")),
                stderr: "boom".to_string(),
                exit_code: Some(1),
            });
        }
        Ok(self.output.clone())
    }
}

fn timeouts() -> ComposeTimeouts {
    ComposeTimeouts {
        probe: Duration::from_secs(5),
        lifecycle: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_ps_runs_in_service_dir_and_parses() {
    let runner = Arc::new(RecordingRunner {
        output: concat!(
            r#"{"Name":"auth-api-1","State":"running","Health":"","Image":"auth","Publishers":[{"PublishedPort":8001}]}"#,
            "\n",
            r#"{"Name":"auth-db-1","State":"running","Health":"healthy","Image":"postgres","Publishers":null}"#,
            "\n"
        )
        .to_string(),
        ..Default::default()
    });
    let client = ComposeClient::new(runner.clone(), timeouts());

    let containers = client.ps(Path::new("/repo/services/auth")).await.unwrap();

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].port, "8001");

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PathBuf::from("/repo/services/auth"));
    assert_eq!(calls[0].1, vec!["ps", "--all", "--format", "json"]);
    assert_eq!(calls[0].2, Duration::from_secs(5));
}

#[tokio::test]
async fn test_lifecycle_commands_use_lifecycle_timeout() {
    let runner = Arc::new(RecordingRunner::default());
    let client = ComposeClient::new(runner.clone(), timeouts());
    let dir = Path::new("/repo/services/auth");

    client.up(dir).await.unwrap();
    client.down(dir).await.unwrap();

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls[0].1, vec!["up", "-d"]);
    assert_eq!(calls[1].1, vec!["down"]);
    assert!(calls.iter().all(|c| c.2 == Duration::from_secs(60)));
}

#[tokio::test]
async fn test_logs_tail_argument() {
    let runner = Arc::new(RecordingRunner {
        output: "api-1  | listening on :8000\n".to_string(),
        ..Default::default()
    });
    let client = ComposeClient::new(runner.clone(), timeouts());
    let dir = Path::new("/repo/services/auth");

    let logs = client.logs(dir, 50).await.unwrap();
    assert_eq!(logs, "api-1  | listening on :8000\n");

    client.logs(dir, 0).await.unwrap();

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls[0].1, vec!["logs", "--no-color", "--tail", "50"]);
    assert_eq!(calls[1].1, vec!["logs", "--no-color"]);
}

#[tokio::test]
async fn test_failure_is_propagated() {
    let runner = Arc::new(RecordingRunner {
        fail: true,
        ..Default::default()
    });
    let client = ComposeClient::new(runner, timeouts());

    let err = client.ps(Path::new("/repo")).await.unwrap_err();
    assert!(matches!(err, ComposeError::CommandFailed { exit_code: Some(1), .. }));
}

#[tokio::test]
async fn test_cli_runner_missing_dir_is_spawn_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("does-not-exist");
    let runner = CliRunner::new(ComposeMode::V2);

    let err = runner
        .run(&missing, &["ps"], Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        ComposeError::Spawn { command, .. } => assert_eq!(command, "docker compose ps"),
        other => panic!("Expected Spawn error, got {:?}", other),
    }
}

/// 呼ばれると眠り続ける docker-compose を PATH の先頭に置いて実行する
#[cfg(unix)]
#[test]
#[serial_test::serial]
fn test_cli_runner_deadline_kills_slow_command() {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = tempfile::tempdir().unwrap();
    let script = bin_dir.path().join("docker-compose");
    std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let work_dir = tempfile::tempdir().unwrap();
    let path = match std::env::var("PATH") {
        Ok(existing) => format!("{}:{}", bin_dir.path().display(), existing),
        Err(_) => bin_dir.path().display().to_string(),
    };

    temp_env::with_var("PATH", Some(path), || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let runner = CliRunner::new(ComposeMode::V1);
            let started = std::time::Instant::now();

            let err = runner
                .run(work_dir.path(), &["ps"], Duration::from_millis(100))
                .await
                .unwrap_err();

            assert!(started.elapsed() < Duration::from_secs(3));
            assert!(err.is_timeout());
            match err {
                ComposeError::Timeout { command, timeout } => {
                    assert_eq!(command, "docker-compose ps");
                    assert_eq!(timeout, Duration::from_millis(100));
                }
                other => panic!("Expected Timeout error, got {:?}", other),
            }
        });
    });
}
