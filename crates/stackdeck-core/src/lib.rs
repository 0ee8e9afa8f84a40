//! stackdeck のコア
//!
//! モノレポ配下の compose サービスを表すデータモデル、
//! コンテナ状態からサービス状態への集約ルール、
//! ディレクトリ規約に基づくサービス発見を提供します。

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod model;
pub mod status;

pub use descriptor::*;
pub use discovery::*;
pub use error::*;
pub use model::*;
pub use status::*;
