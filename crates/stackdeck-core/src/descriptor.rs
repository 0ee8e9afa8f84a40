//! compose 記述子からの表示用メタデータ読み込み
//!
//! 記述子の内容は表示のためにだけ読む。ネットワークやボリュームを
//! 操作することはない。

use crate::error::{CoreError, Result};
use crate::model::Service;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;

/// ヘルスチェック URL を記述する拡張フィールド
pub const HEALTH_ENDPOINT_KEY: &str = "x-health-endpoint";

/// 記述子から読み取ったメタデータ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorMetadata {
    pub networks: Vec<String>,
    pub volumes: Vec<String>,
    pub environment: HashMap<String, String>,
    pub health_endpoint: Option<String>,
}

impl DescriptorMetadata {
    pub fn apply_to(self, service: &mut Service) {
        service.networks = self.networks;
        service.volumes = self.volumes;
        service.environment = self.environment;
        service.health_endpoint = self.health_endpoint;
    }
}

/// 記述子ファイルを読み込む
pub fn read_descriptor(path: &Path) -> Result<DescriptorMetadata> {
    let content = std::fs::read_to_string(path)?;
    parse_descriptor(&content).map_err(|message| CoreError::DiscoveryError {
        path: path.to_path_buf(),
        message,
    })
}

/// 記述子の YAML をパースする
pub fn parse_descriptor(content: &str) -> std::result::Result<DescriptorMetadata, String> {
    if content.trim().is_empty() {
        return Ok(DescriptorMetadata::default());
    }

    let doc: Value =
        serde_yaml::from_str(content).map_err(|e| format!("YAMLパースエラー: {}", e))?;

    let root = match doc {
        Value::Mapping(map) => map,
        Value::Null => return Ok(DescriptorMetadata::default()),
        _ => return Err("トップレベルがマッピングではありません".to_string()),
    };

    let mut meta = DescriptorMetadata {
        networks: sorted_keys(root.get("networks")),
        volumes: sorted_keys(root.get("volumes")),
        health_endpoint: root
            .get(HEALTH_ENDPOINT_KEY)
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        ..Default::default()
    };

    // 後に定義されたサービスの値が優先される
    if let Some(Value::Mapping(services)) = root.get("services") {
        for (_, service) in services {
            if let Some(env) = service.get("environment") {
                merge_environment(&mut meta.environment, env);
            }
        }
    }

    Ok(meta)
}

fn sorted_keys(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Mapping(map)) = value else {
        return Vec::new();
    };
    let mut keys: Vec<String> = map.keys().filter_map(scalar_to_string).collect();
    keys.sort();
    keys
}

/// environment はマッピング形式と `KEY=VALUE` のリスト形式の両方がある
fn merge_environment(target: &mut HashMap<String, String>, env: &Value) {
    match env {
        Value::Mapping(map) => merge_mapping(target, map),
        Value::Sequence(items) => {
            for item in items.iter().filter_map(Value::as_str) {
                match item.split_once('=') {
                    Some((key, value)) => target.insert(key.to_string(), value.to_string()),
                    None => target.insert(item.to_string(), String::new()),
                };
            }
        }
        _ => {}
    }
}

fn merge_mapping(target: &mut HashMap<String, String>, map: &Mapping) {
    for (key, value) in map {
        if let Some(key) = scalar_to_string(key) {
            let value = scalar_to_string(value).unwrap_or_default();
            target.insert(key, value);
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
