//! サービスレジストリとステータスエンジン
//!
//! - **Registry**: サービス名 → サービスレコードの共有マップ（ロックで保護）
//! - **Prober**: compose ps を実行してレコードを更新（短時間の結果キャッシュ付き）
//! - **Lifecycle**: start / stop / restart（サービス単位で直列化）
//! - **ServiceManager**: 上記をまとめた API 層向けの窓口

pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod prober;
pub mod registry;

pub use cache::{ProbeCache, ProbeFailure};
pub use error::*;
pub use lifecycle::{LifecycleAction, LifecycleController};
pub use manager::{ManagerOptions, ServiceManager};
pub use prober::Prober;
pub use registry::ServiceRegistry;
