//! サービスレコードの共有マップ
//!
//! すべての読み書きは1回の論理操作ごとにロックを取る。
//! ロックを保持したまま外部コマンドを待つことはない。

use stackdeck_core::{Container, Service, sorted_snapshot};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// キーは発見時にだけ決まり、以後はレコードの中身だけが更新される
#[derive(Debug)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Service>>,
}

impl ServiceRegistry {
    /// 発見済みのサービスからレジストリを作る
    pub fn from_services(services: impl IntoIterator<Item = Service>) -> Self {
        let map = services
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect::<HashMap<_, _>>();
        Self {
            services: RwLock::new(map),
        }
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.read().await.is_empty()
    }

    /// 登録済みのサービス名（ソート済み）
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn get(&self, name: &str) -> Option<Service> {
        self.services.read().await.get(name).cloned()
    }

    pub async fn path_of(&self, name: &str) -> Option<PathBuf> {
        self.services.read().await.get(name).map(|s| s.path.clone())
    }

    /// name でソートしたスナップショット
    pub async fn snapshot(&self) -> Vec<Service> {
        let services = self.services.read().await;
        sorted_snapshot(services.values())
    }

    /// プローブ成功を反映し、更新後のレコードを返す
    pub async fn apply_containers(
        &self,
        name: &str,
        containers: Vec<Container>,
    ) -> Option<Service> {
        let mut services = self.services.write().await;
        let service = services.get_mut(name)?;
        service.apply_containers(containers);
        Some(service.clone())
    }

    /// プローブ失敗を反映し、更新後のレコードを返す
    pub async fn mark_failed(&self, name: &str) -> Option<Service> {
        let mut services = self.services.write().await;
        let service = services.get_mut(name)?;
        service.mark_failed();
        Some(service.clone())
    }
}
