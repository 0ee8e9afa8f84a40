use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use stackdeck_compose::{ComposeClient, ComposeError, ComposeRunner, ComposeTimeouts, Result};
use stackdeck_core::Service;
use stackdeck_registry::{ManagerOptions, ServiceManager};
use stackdeckd::AppState;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// ps は常に稼働中の1コンテナを返す。failing に登録した組だけ失敗する
#[derive(Default)]
struct FakeRunner {
    failing: HashSet<(String, String)>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRunner {
    fn failing(mut self, service: &str, subcommand: &str) -> Self {
        self.failing
            .insert((service.to_string(), subcommand.to_string()));
        self
    }

    fn calls_for(&self, service: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == service)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl ComposeRunner for FakeRunner {
    async fn run(&self, dir: &Path, args: &[&str], _timeout: Duration) -> Result<String> {
        let service = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.calls
            .lock()
            .unwrap()
            .push((service.clone(), args.clone()));

        let subcommand = args.first().cloned().unwrap_or_default();
        if self.failing.contains(&(service.clone(), subcommand.clone())) {
            return Err(ComposeError::CommandFailed {
                command: format!("docker compose {}", args.join(" ")),
                stderr: format!("{} exploded", service),
                exit_code: Some(1),
            });
        }

        match subcommand.as_str() {
            "ps" => Ok(format!(
                r#"{{"Name":"{}-api-1","State":"running","Health":"healthy","Image":"{}:latest","Publishers":[{{"PublishedPort":8080}}]}}"#,
                service, service
            )),
            "logs" => Ok(format!("{} | hello\n", service)),
            _ => Ok(String::new()),
        }
    }
}

struct TestServer {
    addr: SocketAddr,
    runner: Arc<FakeRunner>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn spawn_server(runner: FakeRunner) -> TestServer {
    let runner = Arc::new(runner);
    let compose = ComposeClient::new(runner.clone(), ComposeTimeouts::default());
    let services = vec![
        Service::discovered("web_bff", "/repo/services/web_bff"),
        Service::discovered("auth", "/repo/services/auth"),
        Service::discovered("human", "/repo/services/db/human"),
    ];
    let manager = ServiceManager::new(services, compose, ManagerOptions::immediate());
    let state = AppState {
        manager: Arc::new(manager),
        broadcast_interval: Duration::from_millis(50),
        default_log_lines: 100,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        stackdeckd::serve(listener, state, shutdown).await.unwrap();
    });

    TestServer {
        addr,
        runner,
        shutdown: Some(tx),
    }
}

#[tokio::test]
async fn test_list_services_sorted_with_status() {
    let server = spawn_server(FakeRunner::default().failing("human", "ps")).await;

    let body: Value = reqwest::get(server.url("/api/services"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let services = body.as_array().unwrap();

    let names: Vec<&str> = services
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["auth", "human", "web_bff"]);

    assert_eq!(services[0]["status"], "running");
    assert_eq!(services[0]["containers"][0]["port"], "8080");
    assert_eq!(services[0]["containers"][0]["health"], "healthy");
    assert!(services[0].get("health_endpoint").is_none());
    assert!(services[0]["last_checked"].is_string());

    assert_eq!(services[1]["status"], "error");
    assert_eq!(services[1]["containers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_lifecycle_routes() {
    let server = spawn_server(FakeRunner::default()).await;
    let client = reqwest::Client::new();

    for (action, past) in [
        ("start", "started"),
        ("stop", "stopped"),
        ("restart", "restarted"),
    ] {
        let response = client
            .post(server.url(&format!("/api/services/auth/{}", action)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], format!("Service auth {}", past));
    }

    let subcommands: Vec<String> = server
        .runner
        .calls_for("auth")
        .into_iter()
        .map(|args| args[0].clone())
        .collect();
    assert_eq!(
        subcommands,
        vec!["up", "ps", "down", "ps", "down", "up", "ps"]
    );
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let server = spawn_server(FakeRunner::default().failing("auth", "up")).await;
    let client = reqwest::Client::new();

    let failed = client
        .post(server.url("/api/services/auth/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), 500);
    let body: Value = failed.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("auth exploded"));

    let missing = client
        .post(server.url("/api/services/ghost/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ghost"));

    let unknown = client
        .post(server.url("/api/services/auth/explode"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_status_route() {
    let server = spawn_server(FakeRunner::default().failing("human", "ps")).await;

    let ok = reqwest::get(server.url("/api/services/auth/status"))
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["name"], "auth");
    assert_eq!(body["status"], "running");
    assert_eq!(body["path"], "/repo/services/auth");

    let failed = reqwest::get(server.url("/api/services/human/status"))
        .await
        .unwrap();
    assert_eq!(failed.status(), 500);

    let missing = reqwest::get(server.url("/api/services/ghost/status"))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_logs_route() {
    let server = spawn_server(FakeRunner::default().failing("human", "logs")).await;

    let body: Value = reqwest::get(server.url("/api/services/auth/logs?lines=20"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["logs"], "auth | hello\n");

    reqwest::get(server.url("/api/services/auth/logs?lines=abc"))
        .await
        .unwrap();

    let calls = server.runner.calls_for("auth");
    assert_eq!(calls[0], vec!["logs", "--no-color", "--tail", "20"]);
    assert_eq!(calls[1], vec!["logs", "--no-color", "--tail", "100"]);

    let failed = reqwest::get(server.url("/api/services/human/logs"))
        .await
        .unwrap();
    assert_eq!(failed.status(), 500);
}

#[tokio::test]
async fn test_healthz() {
    let server = spawn_server(FakeRunner::default()).await;

    let response = reqwest::get(server.url("/healthz")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_websocket_pushes_sorted_snapshots() {
    let server = spawn_server(FakeRunner::default()).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();

    for _ in 0..2 {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let snapshot: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
        let names: Vec<&str> = snapshot
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["auth", "human", "web_bff"]);
        assert_eq!(snapshot[1]["status"], "running");
    }
}

#[tokio::test]
async fn test_websocket_disconnect_does_not_affect_others() {
    let server = spawn_server(FakeRunner::default()).await;
    let url = format!("ws://{}/ws", server.addr);

    let (first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    drop(first);

    let message = tokio::time::timeout(Duration::from_secs(5), second.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(message.is_text());

    let response = reqwest::get(server.url("/healthz")).await.unwrap();
    assert_eq!(response.status(), 200);
}
