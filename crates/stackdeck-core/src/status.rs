//! コンテナ状態からサービス状態への集約

use crate::model::Container;
use serde::{Deserialize, Serialize};
use std::fmt;

/// サービス全体の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// まだプローブしていない
    Unknown,
    Running,
    Stopped,
    /// 一部のコンテナのみ running
    Partial,
    /// プローブ自体が失敗した
    Error,
}

impl ServiceStatus {
    /// コンテナ数 `total` と running 数 `running` から状態を決める
    ///
    /// | total | running | 状態 |
    /// |---|---|---|
    /// | 0 | - | stopped |
    /// | n > 0 | 0 | stopped |
    /// | n | n | running |
    /// | n | 0 < k < n | partial |
    pub fn from_counts(total: usize, running: usize) -> Self {
        debug_assert!(running <= total);
        if total == 0 || running == 0 {
            ServiceStatus::Stopped
        } else if running >= total {
            ServiceStatus::Running
        } else {
            ServiceStatus::Partial
        }
    }

    /// コンテナ一覧から状態を決める
    pub fn aggregate(containers: &[Container]) -> Self {
        let running = containers.iter().filter(|c| c.is_running()).count();
        Self::from_counts(containers.len(), running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Partial => "partial",
            ServiceStatus::Error => "error",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
