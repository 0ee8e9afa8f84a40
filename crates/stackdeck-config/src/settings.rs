//! stackdeck の設定値

use stackdeck_compose::{ComposeMode, ComposeTimeouts};
use stackdeck_core::DiscoveryLayout;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// デフォルトの待ち受けポート
pub const DEFAULT_PORT: u16 = 9000;

/// デフォルトのログ行数
pub const DEFAULT_LOG_LINES: usize = 100;

/// 実行時設定
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// モノレポのルート
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    /// サービス発見の規約
    pub layout: DiscoveryLayout,
    pub compose: ComposeMode,
    /// WebSocket クライアントへの配信間隔
    pub broadcast_interval: Duration,
    /// 同一サービスのプローブ結果を再利用する期間
    pub probe_cache_ttl: Duration,
    /// ps / logs のタイムアウト
    pub probe_timeout: Duration,
    /// up / down のタイムアウト
    pub lifecycle_timeout: Duration,
    /// restart の stop と start の間の待ち
    pub restart_settle: Duration,
    /// start / stop 後、再プローブまでの待ち
    pub post_op_grace: Duration,
    /// restart 後、再プローブまでの待ち
    pub restart_grace: Duration,
    pub default_log_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            layout: DiscoveryLayout::default(),
            compose: ComposeMode::Auto,
            broadcast_interval: Duration::from_secs(5),
            probe_cache_ttl: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(30),
            lifecycle_timeout: Duration::from_secs(120),
            restart_settle: Duration::from_secs(2),
            post_op_grace: Duration::from_secs(2),
            restart_grace: Duration::from_secs(3),
            default_log_lines: DEFAULT_LOG_LINES,
        }
    }
}

impl Settings {
    /// 待ち受けアドレス
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().ok()
    }

    pub fn compose_timeouts(&self) -> ComposeTimeouts {
        ComposeTimeouts {
            probe: self.probe_timeout,
            lifecycle: self.lifecycle_timeout,
        }
    }
}

/// コマンドライン引数による上書き
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}
