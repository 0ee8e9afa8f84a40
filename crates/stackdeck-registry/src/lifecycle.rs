//! start / stop / restart
//!
//! 同じサービスへの操作はサービス単位のロックで直列化する。
//! 異なるサービスの操作は並行して進む。

use crate::error::{RegistryError, Result};
use crate::registry::ServiceRegistry;
use stackdeck_compose::ComposeClient;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        }
    }

    /// レスポンスメッセージ用の過去形
    pub fn past_tense(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "started",
            LifecycleAction::Stop => "stopped",
            LifecycleAction::Restart => "restarted",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(LifecycleAction::Start),
            "stop" => Ok(LifecycleAction::Stop),
            "restart" => Ok(LifecycleAction::Restart),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

pub struct LifecycleController {
    registry: Arc<ServiceRegistry>,
    compose: ComposeClient,
    restart_settle: Duration,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        compose: ComposeClient,
        restart_settle: Duration,
    ) -> Self {
        Self {
            registry,
            compose,
            restart_settle,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(&self, action: LifecycleAction, name: &str) -> Result<()> {
        match action {
            LifecycleAction::Start => self.start(name).await,
            LifecycleAction::Stop => self.stop(name).await,
            LifecycleAction::Restart => self.restart(name).await,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn start(&self, name: &str) -> Result<()> {
        let path = self.path_of(name).await?;
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        info!(service = %name, "Starting service");
        self.compose.up(&path).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, name: &str) -> Result<()> {
        let path = self.path_of(name).await?;
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        info!(service = %name, "Stopping service");
        self.compose.down(&path).await?;
        Ok(())
    }

    /// stop → 待機 → start
    ///
    /// 待機は stop の成否に関わらず行う。stop が失敗したら start は実行せず
    /// stop のエラーを返す。
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self, name: &str) -> Result<()> {
        let path = self.path_of(name).await?;
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        info!(service = %name, "Restarting service");
        let stopped = self.compose.down(&path).await;
        tokio::time::sleep(self.restart_settle).await;
        stopped?;
        self.compose.up(&path).await?;
        Ok(())
    }

    async fn path_of(&self, name: &str) -> Result<std::path::PathBuf> {
        self.registry
            .path_of(name)
            .await
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(name.to_string()).or_default().clone()
    }
}
