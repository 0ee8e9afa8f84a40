//! API 層向けの窓口
//!
//! レジストリ・プローバー・ライフサイクルをまとめ、
//! 操作後の待機と再プローブを受け持つ。

use crate::error::{RegistryError, Result};
use crate::lifecycle::{LifecycleAction, LifecycleController};
use crate::prober::Prober;
use crate::registry::ServiceRegistry;
use futures_util::future::join_all;
use stackdeck_compose::ComposeClient;
use stackdeck_core::Service;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 待機時間の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// プローブ結果を再利用する期間
    pub probe_cache_ttl: Duration,
    /// restart の stop と start の間
    pub restart_settle: Duration,
    /// start / stop 後、再プローブまでの待機
    pub post_op_grace: Duration,
    /// restart 後、再プローブまでの待機
    pub restart_grace: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            probe_cache_ttl: Duration::from_secs(2),
            restart_settle: Duration::from_secs(2),
            post_op_grace: Duration::from_secs(2),
            restart_grace: Duration::from_secs(3),
        }
    }
}

impl ManagerOptions {
    /// 待機なし・キャッシュなし（テスト用）
    pub fn immediate() -> Self {
        Self {
            probe_cache_ttl: Duration::ZERO,
            restart_settle: Duration::ZERO,
            post_op_grace: Duration::ZERO,
            restart_grace: Duration::ZERO,
        }
    }

    fn grace_for(&self, action: LifecycleAction) -> Duration {
        match action {
            LifecycleAction::Restart => self.restart_grace,
            LifecycleAction::Start | LifecycleAction::Stop => self.post_op_grace,
        }
    }
}

pub struct ServiceManager {
    registry: Arc<ServiceRegistry>,
    prober: Prober,
    lifecycle: LifecycleController,
    compose: ComposeClient,
    options: ManagerOptions,
}

impl ServiceManager {
    pub fn new(services: Vec<Service>, compose: ComposeClient, options: ManagerOptions) -> Self {
        let registry = Arc::new(ServiceRegistry::from_services(services));
        let prober = Prober::new(registry.clone(), compose.clone(), options.probe_cache_ttl);
        let lifecycle =
            LifecycleController::new(registry.clone(), compose.clone(), options.restart_settle);
        Self {
            registry,
            prober,
            lifecycle,
            compose,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// 全サービスを並行してプローブし、失敗したサービス名を返す
    ///
    /// 失敗はレコードに反映済みなのでログのみ。キャッシュから再報告された失敗も含む。
    pub async fn refresh_all(&self) -> Vec<String> {
        let names = self.registry.names().await;
        let results = join_all(names.iter().map(|name| self.prober.probe(name))).await;

        let mut failed = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    service = %name,
                    error = %e,
                    timeout = e.is_timeout(),
                    cached = matches!(e, RegistryError::CachedFailure(_)),
                    "Service refresh failed"
                );
                failed.push(name);
            }
        }
        debug!(failed = failed.len(), "Refreshed all services");
        failed
    }

    /// 全サービスを更新してスナップショットを返す
    pub async fn list(&self) -> Vec<Service> {
        self.refresh_all().await;
        self.registry.snapshot().await
    }

    /// プローブなしの現在のスナップショット
    pub async fn snapshot(&self) -> Vec<Service> {
        self.registry.snapshot().await
    }

    /// 単一サービスをプローブして返す
    pub async fn status(&self, name: &str) -> Result<Service> {
        self.prober.probe(name).await
    }

    pub async fn start(&self, name: &str) -> Result<()> {
        self.run(LifecycleAction::Start, name).await
    }

    pub async fn stop(&self, name: &str) -> Result<()> {
        self.run(LifecycleAction::Stop, name).await
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        self.run(LifecycleAction::Restart, name).await
    }

    /// ライフサイクル操作を実行し、待機後に再プローブする
    ///
    /// 再プローブの失敗は操作の結果に影響しない。
    pub async fn run(&self, action: LifecycleAction, name: &str) -> Result<()> {
        if let Err(e) = self.lifecycle.run(action, name).await {
            warn!(service = %name, action = %action, error = %e, "Lifecycle operation failed");
            return Err(e);
        }
        info!(service = %name, action = %action, "Lifecycle operation completed");

        tokio::time::sleep(self.options.grace_for(action)).await;
        self.prober.invalidate(name).await;
        if let Err(e) = self.prober.probe(name).await {
            warn!(service = %name, error = %e, "Post-operation probe failed");
        }
        Ok(())
    }

    /// 直近のログを取得する。`lines == 0` なら全件
    pub async fn logs(&self, name: &str, lines: usize) -> Result<String> {
        let path = self
            .registry
            .path_of(name)
            .await
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))?;
        Ok(self.compose.logs(&path, lines).await?)
    }
}
