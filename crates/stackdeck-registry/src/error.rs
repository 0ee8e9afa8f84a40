//! レジストリのエラー型

use crate::cache::ProbeFailure;
use stackdeck_compose::ComposeError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("サービスが見つかりません: {0}")]
    ServiceNotFound(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// キャッシュされた直近のプローブ失敗
    #[error("{0}")]
    CachedFailure(ProbeFailure),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::ServiceNotFound(_))
    }

    /// コマンドの期限切れによる失敗か（キャッシュからの再報告を含む）
    pub fn is_timeout(&self) -> bool {
        match self {
            RegistryError::Compose(e) => e.is_timeout(),
            RegistryError::CachedFailure(failure) => failure.timed_out,
            RegistryError::ServiceNotFound(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
