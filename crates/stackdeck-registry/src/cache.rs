//! プローブ結果の短期キャッシュ
//!
//! サービスごとにスロット（非同期 Mutex）を持つ。同じサービスへの同時プローブは
//! スロットのロック待ちになり、先行したプローブの結果を共有する。

use stackdeck_compose::ComposeError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// キャッシュに残すプローブ失敗
///
/// `ComposeError` は複製できないため、メッセージとタイムアウトかどうかだけを保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub message: String,
    pub timed_out: bool,
}

impl From<&ComposeError> for ProbeFailure {
    fn from(err: &ComposeError) -> Self {
        Self {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 直近のプローブ結果
#[derive(Debug, Clone)]
pub struct CachedProbe {
    pub at: Instant,
    pub outcome: std::result::Result<(), ProbeFailure>,
}

impl CachedProbe {
    pub fn now(outcome: std::result::Result<(), ProbeFailure>) -> Self {
        Self {
            at: Instant::now(),
            outcome,
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.at.elapsed() < ttl
    }
}

pub type ProbeSlot = Arc<Mutex<Option<CachedProbe>>>;

#[derive(Debug)]
pub struct ProbeCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, ProbeSlot>>,
}

impl ProbeCache {
    /// `ttl` がゼロなら毎回プローブする
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// サービスのスロットを取得（なければ作る）
    pub async fn slot(&self, name: &str) -> ProbeSlot {
        let mut slots = self.slots.lock().await;
        slots.entry(name.to_string()).or_default().clone()
    }

    /// キャッシュを破棄する。実行中のプローブがあれば完了を待つ
    pub async fn invalidate(&self, name: &str) {
        let slot = self.slot(name).await;
        *slot.lock().await = None;
    }
}
