//! stackdeck daemon
//!
//! 起動時にサービスを発見し、HTTP API と WebSocket でステータスを配信する。

pub mod api;
pub mod ws;

use anyhow::Context;
use stackdeck_compose::{CliRunner, ComposeClient};
use stackdeck_config::Settings;
use stackdeck_registry::{ManagerOptions, ServiceManager};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use api::router;

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ServiceManager>,
    pub broadcast_interval: Duration,
    pub default_log_lines: usize,
}

impl AppState {
    pub fn new(manager: ServiceManager, settings: &Settings) -> Self {
        Self {
            manager: Arc::new(manager),
            broadcast_interval: settings.broadcast_interval,
            default_log_lines: settings.default_log_lines,
        }
    }
}

/// 設定の待機時間をマネージャー用に変換する
pub fn manager_options(settings: &Settings) -> ManagerOptions {
    ManagerOptions {
        probe_cache_ttl: settings.probe_cache_ttl,
        restart_settle: settings.restart_settle,
        post_op_grace: settings.post_op_grace,
        restart_grace: settings.restart_grace,
    }
}

/// 発見 → 初回プローブ → 待ち受け開始
pub async fn run(
    settings: Settings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let services = stackdeck_core::discover_services(&settings.root, &settings.layout)
        .with_context(|| format!("サービスの発見に失敗しました: {}", settings.root.display()))?;

    let runner = Arc::new(CliRunner::new(settings.compose));
    let compose = ComposeClient::new(runner, settings.compose_timeouts());
    let manager = ServiceManager::new(services, compose, manager_options(&settings));

    let registry = manager.registry();
    if registry.is_empty().await {
        warn!(root = %settings.root.display(), "No services discovered");
    } else {
        info!(
            root = %settings.root.display(),
            count = registry.len().await,
            "Services registered"
        );
    }

    let failed = manager.refresh_all().await;
    info!(failed = failed.len(), "Initial refresh completed");

    let addr = settings
        .listen_addr()
        .with_context(|| format!("不正な待ち受けアドレス: {}:{}", settings.host, settings.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{} にバインドできません", addr))?;

    serve(listener, AppState::new(manager, &settings), shutdown).await
}

/// 既にバインド済みのリスナーで API を提供する
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "stackdeckd listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("stackdeckd stopped");
    Ok(())
}
