//! stackdeck.kdl パーサー
//!
//! ```kdl
//! root "../.."
//! port 9000
//! compose "auto"
//! descriptor "docker-compose.yml"
//! services-dir "services"
//! db-dir "db"
//! shared-services path="infrastructure/shared-services" name="shared-services"
//! broadcast-interval "5s"
//! probe-cache-ttl "2s"
//! probe-timeout "30s"
//! lifecycle-timeout "2m"
//! restart-settle "2s"
//! post-op-grace "2s"
//! restart-grace "3s"
//! log-lines 100
//! ```

use crate::duration::parse_duration;
use crate::error::{ConfigError, Result};
use crate::settings::Settings;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// KDLファイルを読み込み、settings に適用する
///
/// 相対パスの root はファイルのあるディレクトリ基準で解決する。
pub fn apply_config_file(settings: &mut Settings, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    apply_config(settings, &content, base)
}

/// KDL文字列を settings に適用する
pub fn apply_config(settings: &mut Settings, content: &str, base: &Path) -> Result<()> {
    let doc: KdlDocument = content.parse()?;

    for node in doc.nodes() {
        let key = node.name().value();
        match key {
            "root" => {
                let root = PathBuf::from(string_arg(node)?);
                settings.root = if root.is_absolute() {
                    root
                } else {
                    base.join(root)
                };
            }
            "host" => settings.host = string_arg(node)?.to_string(),
            "port" => {
                let port = integer_arg(node)?;
                settings.port = u16::try_from(port).map_err(|_| invalid(key, port))?;
            }
            "compose" => {
                let mode = string_arg(node)?;
                settings.compose = mode.parse().map_err(|_| invalid(key, mode))?;
            }
            "descriptor" => settings.layout.descriptor = string_arg(node)?.to_string(),
            "services-dir" => settings.layout.services_dir = PathBuf::from(string_arg(node)?),
            "db-dir" => settings.layout.db_dir = string_arg(node)?.to_string(),
            "shared-services" => {
                if let Some(path) = property(node, "path") {
                    settings.layout.shared_services_path = PathBuf::from(path);
                }
                if let Some(name) = property(node, "name") {
                    settings.layout.shared_services_name = name.to_string();
                }
            }
            "broadcast-interval" => settings.broadcast_interval = duration_arg(node)?,
            "probe-cache-ttl" => settings.probe_cache_ttl = duration_arg(node)?,
            "probe-timeout" => settings.probe_timeout = duration_arg(node)?,
            "lifecycle-timeout" => settings.lifecycle_timeout = duration_arg(node)?,
            "restart-settle" => settings.restart_settle = duration_arg(node)?,
            "post-op-grace" => settings.post_op_grace = duration_arg(node)?,
            "restart-grace" => settings.restart_grace = duration_arg(node)?,
            "log-lines" => {
                let lines = integer_arg(node)?;
                settings.default_log_lines =
                    usize::try_from(lines).map_err(|_| invalid(key, lines))?;
            }
            other => {
                // 不明なノードはスキップ
                warn!(node = %other, "Unknown config node, skipping");
            }
        }
    }

    if settings.broadcast_interval.is_zero() {
        return Err(ConfigError::InvalidConfig(
            "broadcast-interval は 0 より大きい必要があります".to_string(),
        ));
    }

    Ok(())
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn first_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn property<'a>(node: &'a KdlNode, name: &str) -> Option<&'a str> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(name))
        .and_then(|e| e.value().as_string())
}

fn string_arg(node: &KdlNode) -> Result<&str> {
    first_arg(node).and_then(|v| v.as_string()).ok_or_else(|| {
        ConfigError::InvalidConfig(format!("{} には文字列が必要です", node.name().value()))
    })
}

fn integer_arg(node: &KdlNode) -> Result<i128> {
    first_arg(node).and_then(|v| v.as_integer()).ok_or_else(|| {
        ConfigError::InvalidConfig(format!("{} には整数が必要です", node.name().value()))
    })
}

/// "5s" 形式の文字列か、秒数の整数を受け付ける
fn duration_arg(node: &KdlNode) -> Result<Duration> {
    let key = node.name().value();
    match first_arg(node) {
        Some(value) => {
            if let Some(s) = value.as_string() {
                parse_duration(s).ok_or_else(|| invalid(key, s))
            } else if let Some(secs) = value.as_integer() {
                u64::try_from(secs)
                    .map(Duration::from_secs)
                    .map_err(|_| invalid(key, secs))
            } else {
                Err(invalid(key, value))
            }
        }
        None => Err(ConfigError::InvalidConfig(format!(
            "{} には期間が必要です",
            key
        ))),
    }
}
