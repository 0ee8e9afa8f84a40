//! サービスとコンテナのデータモデル

use crate::status::ServiceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// compose 記述子を持つ1つのデプロイ単位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// サービス名（レジストリのキー）
    pub name: String,
    /// compose 記述子があるディレクトリ
    pub path: PathBuf,
    pub status: ServiceStatus,
    pub containers: Vec<Container>,
    /// 最後にプローブした時刻
    pub last_checked: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_endpoint: Option<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Service {
    /// 発見直後のサービスを作成（状態は unknown、コンテナは空）
    pub fn discovered(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            status: ServiceStatus::Unknown,
            containers: Vec::new(),
            last_checked: Utc::now(),
            health_endpoint: None,
            networks: Vec::new(),
            volumes: Vec::new(),
            environment: HashMap::new(),
        }
    }

    /// プローブ成功の結果を反映する
    ///
    /// status は常に containers から導出される。
    pub fn apply_containers(&mut self, containers: Vec<Container>) {
        self.status = ServiceStatus::aggregate(&containers);
        self.containers = containers;
        self.last_checked = Utc::now();
    }

    /// プローブ失敗を反映する（error 状態、コンテナはクリア）
    pub fn mark_failed(&mut self) {
        self.status = ServiceStatus::Error;
        self.containers.clear();
        self.last_checked = Utc::now();
    }
}

/// オーケストレータが報告する1つのコンテナ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    /// オーケストレータの生の状態文字列（running, exited など）
    pub status: String,
    pub health: String,
    pub image: String,
    /// 最初の公開ポート（あれば）
    #[serde(default)]
    pub port: String,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// name でソートしたスナップショットを作る
///
/// sort_by は安定ソートなので同名の並びは保たれる。
pub fn sorted_snapshot<'a>(services: impl IntoIterator<Item = &'a Service>) -> Vec<Service> {
    let mut snapshot: Vec<Service> = services.into_iter().cloned().collect();
    snapshot.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot
}
