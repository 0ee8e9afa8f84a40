//! サービス自動発見機能
//!
//! 規約ベースのディレクトリ構造から compose 記述子を持つディレクトリを発見し、
//! それぞれを1つのサービスとして登録します。
//!
//! - `services/db/**` を再帰的に走査（`db` ディレクトリ自身は除く）
//! - `services/*` の直下ディレクトリ（`db` を除く）
//! - 共有インフラ（`infrastructure/shared-services`）を固定名で登録

use crate::descriptor::read_descriptor;
use crate::error::{CoreError, Result};
use crate::model::Service;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// デフォルトの compose 記述子ファイル名
pub const DEFAULT_DESCRIPTOR: &str = "docker-compose.yml";

/// 発見対象のディレクトリ規約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryLayout {
    /// サービスを示す記述子ファイル名
    pub descriptor: String,
    /// ルートからのサービスディレクトリ
    pub services_dir: PathBuf,
    /// サービスディレクトリ配下の予約ディレクトリ名（再帰走査される）
    pub db_dir: String,
    /// ルートからの共有インフラのパス
    pub shared_services_path: PathBuf,
    /// 共有インフラを登録する名前
    pub shared_services_name: String,
}

impl Default for DiscoveryLayout {
    fn default() -> Self {
        Self {
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            services_dir: PathBuf::from("services"),
            db_dir: "db".to_string(),
            shared_services_path: PathBuf::from("infrastructure/shared-services"),
            shared_services_name: "shared-services".to_string(),
        }
    }
}

/// ルートからサービスを発見する
///
/// サービスディレクトリ自体が読めない場合は致命的エラー。
/// `db` 配下の走査失敗はログに残して無視する（部分的な発見で続行）。
/// 返り値は name でソート済み。同名のサービスは後の規則が勝つ。
#[tracing::instrument(skip(layout), fields(root = %root.display()))]
pub fn discover_services(root: &Path, layout: &DiscoveryLayout) -> Result<Vec<Service>> {
    let services_root = root.join(&layout.services_dir);
    let mut found: HashMap<String, PathBuf> = HashMap::new();

    // 1. services/db/** を再帰的に走査
    let db_root = services_root.join(&layout.db_dir);
    if db_root.is_dir() {
        let mut dirs = Vec::new();
        let mut visited = HashSet::new();
        visit_db_dir(&db_root, &layout.descriptor, &mut dirs, &mut visited);
        for dir in dirs {
            let Some(name) = dir_name(&dir) else {
                continue;
            };
            if name == layout.db_dir {
                continue;
            }
            register(&mut found, name, dir);
        }
    }

    // 2. services/* の直下
    let entries = std::fs::read_dir(&services_root).map_err(|e| CoreError::DiscoveryError {
        path: services_root.clone(),
        message: format!("ディレクトリの読み込みに失敗: {}", e),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| CoreError::DiscoveryError {
            path: services_root.clone(),
            message: format!("ディレクトリエントリの読み込みに失敗: {}", e),
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = dir_name(&path) else {
            continue;
        };
        if name == layout.db_dir {
            continue;
        }
        if path.join(&layout.descriptor).is_file() {
            register(&mut found, name, path);
        }
    }

    // 3. 共有インフラ
    let shared = root.join(&layout.shared_services_path);
    if shared.join(&layout.descriptor).is_file() {
        register(&mut found, layout.shared_services_name.clone(), shared);
    }

    let mut services: Vec<Service> = found
        .into_iter()
        .map(|(name, path)| {
            let mut service = Service::discovered(name, path);
            load_metadata(&mut service, &layout.descriptor);
            service
        })
        .collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));

    info!(service_count = services.len(), "Discovered services");
    Ok(services)
}

fn register(found: &mut HashMap<String, PathBuf>, name: String, path: PathBuf) {
    debug!(service = %name, path = %path.display(), "Found service");
    if let Some(previous) = found.insert(name.clone(), path) {
        warn!(
            service = %name,
            replaced = %previous.display(),
            "Duplicate service name, later definition wins"
        );
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

/// 記述子からメタデータを読み込む（失敗しても登録は続行）
fn load_metadata(service: &mut Service, descriptor: &str) {
    let file = service.path.join(descriptor);
    match read_descriptor(&file) {
        Ok(meta) => meta.apply_to(service),
        Err(e) => warn!(service = %service.name, error = %e, "Failed to read descriptor metadata"),
    }
}

/// db 配下を再帰的に走査し、記述子を直接含むディレクトリを集める
///
/// 読めないサブツリーは警告を出してスキップする。
fn visit_db_dir(
    dir: &Path,
    descriptor: &str,
    dirs: &mut Vec<PathBuf>,
    visited: &mut HashSet<PathBuf>,
) {
    // 正規化されたパスでループを検出
    let canonical_dir = match dir.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Error walking db directory");
            return;
        }
    };
    if !visited.insert(canonical_dir) {
        warn!(dir = %dir.display(), "Symlink loop detected, skipping");
        return;
    }

    if dir.join(descriptor).is_file() {
        dirs.push(dir.to_path_buf());
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Error walking db directory");
            return;
        }
    };

    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_dir() {
                    visit_db_dir(&path, descriptor, dirs, visited);
                }
            }
            Err(e) => warn!(dir = %dir.display(), error = %e, "Error walking db directory"),
        }
    }
}
