//! compose ps によるステータス取得

use crate::cache::{CachedProbe, ProbeCache, ProbeFailure};
use crate::error::{RegistryError, Result};
use crate::registry::ServiceRegistry;
use stackdeck_compose::ComposeClient;
use stackdeck_core::Service;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct Prober {
    registry: Arc<ServiceRegistry>,
    compose: ComposeClient,
    cache: ProbeCache,
}

impl Prober {
    pub fn new(registry: Arc<ServiceRegistry>, compose: ComposeClient, cache_ttl: Duration) -> Self {
        Self {
            registry,
            compose,
            cache: ProbeCache::new(cache_ttl),
        }
    }

    /// サービスをプローブし、更新後のレコードを返す
    ///
    /// 失敗時はレコードを error 状態（コンテナなし）にしてからエラーを返す。
    /// TTL 内の結果があればコマンドは実行しない。
    #[tracing::instrument(skip(self))]
    pub async fn probe(&self, name: &str) -> Result<Service> {
        let path = self
            .registry
            .path_of(name)
            .await
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))?;

        let slot = self.cache.slot(name).await;
        let mut cached = slot.lock().await;

        if let Some(hit) = cached.as_ref()
            && hit.is_fresh(self.cache.ttl())
        {
            debug!(service = %name, "Probe cache hit");
            return match &hit.outcome {
                Ok(()) => self.current(name).await,
                Err(failure) => Err(RegistryError::CachedFailure(failure.clone())),
            };
        }

        match self.compose.ps(&path).await {
            Ok(containers) => {
                debug!(service = %name, containers = containers.len(), "Probe succeeded");
                *cached = Some(CachedProbe::now(Ok(())));
                self.registry
                    .apply_containers(name, containers)
                    .await
                    .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
            }
            Err(e) => {
                warn!(service = %name, error = %e, timeout = e.is_timeout(), "Probe failed");
                *cached = Some(CachedProbe::now(Err(ProbeFailure::from(&e))));
                self.registry.mark_failed(name).await;
                Err(e.into())
            }
        }
    }

    /// 次回のプローブで必ずコマンドを実行させる
    pub async fn invalidate(&self, name: &str) {
        self.cache.invalidate(name).await;
    }

    async fn current(&self, name: &str) -> Result<Service> {
        self.registry
            .get(name)
            .await
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
    }
}
