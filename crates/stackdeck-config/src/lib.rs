pub mod duration;
pub mod error;
pub mod parser;
pub mod settings;

pub use duration::parse_duration;
pub use error::*;
pub use parser::{apply_config, apply_config_file};
pub use settings::*;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 設定ファイル名
pub const CONFIG_FILENAME: &str = "stackdeck.kdl";

/// 設定ファイルパスの環境変数
pub const CONFIG_PATH_ENV: &str = "STACKDECK_CONFIG";

/// ルートディレクトリの環境変数
pub const ROOT_ENV: &str = "STACKDECK_ROOT";

/// 待ち受けホストの環境変数
pub const HOST_ENV: &str = "STACKDECK_HOST";

/// 待ち受けポートの環境変数
pub const PORT_ENV: &str = "PORT";

/// stackdeck.kdl を探す
///
/// 以下の優先順位で検索:
/// 1. 明示的な指定（--config）
/// 2. 環境変数 STACKDECK_CONFIG
/// 3. `<root>/stackdeck.kdl`
/// 4. ~/.config/stackdeck/stackdeck.kdl（グローバル設定）
///
/// 設定ファイルは必須ではないため、見つからない場合は None を返す。
/// 明示的に指定されたパスは存在しなくてもそのまま返す（読み込み時にエラーになる）。
pub fn find_config_file(explicit: Option<&Path>, root: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        debug!(env_path = %path, "Using STACKDECK_CONFIG");
        return Some(PathBuf::from(path));
    }

    let local = root.join(CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }

    let global = dirs::config_dir()?.join("stackdeck").join(CONFIG_FILENAME);
    if global.is_file() {
        return Some(global);
    }

    None
}

/// 設定を読み込む
///
/// 優先順位（後が勝つ）: デフォルト < 設定ファイル < 環境変数 < コマンドライン
pub fn load_settings(overrides: &SettingsOverrides) -> Result<Settings> {
    let mut settings = Settings::default();

    // 設定ファイル探索のために root を先に決める
    if let Some(root) = overrides
        .root
        .clone()
        .or_else(|| std::env::var(ROOT_ENV).ok().map(PathBuf::from))
    {
        settings.root = root;
    }

    if let Some(path) = find_config_file(overrides.config.as_deref(), &settings.root) {
        info!(config = %path.display(), "Loading config file");
        apply_config_file(&mut settings, &path)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    apply_overrides(&mut settings, overrides);

    Ok(settings)
}

/// 環境変数を適用する
pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup(ROOT_ENV).filter(|v| !v.is_empty()) {
        settings.root = PathBuf::from(root);
    }
    if let Some(host) = lookup(HOST_ENV).filter(|v| !v.is_empty()) {
        settings.host = host;
    }
    if let Some(port) = lookup(PORT_ENV).filter(|v| !v.is_empty()) {
        settings.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: PORT_ENV.to_string(),
            value: port.clone(),
        })?;
    }
    Ok(())
}

/// コマンドライン引数を適用する
pub fn apply_overrides(settings: &mut Settings, overrides: &SettingsOverrides) {
    if let Some(root) = &overrides.root {
        settings.root = root.clone();
    }
    if let Some(host) = &overrides.host {
        settings.host = host.clone();
    }
    if let Some(port) = overrides.port {
        settings.port = port;
    }
}
