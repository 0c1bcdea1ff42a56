//! 認証・アカウント管理モジュール
//! トークン検証（Authenticator）と利用者の存在確認（UserDirectory）の
//! インターフェースと、そのインメモリ／JWT実装を提供する。

pub mod jwt;
pub mod users;

pub use jwt::*;
pub use users::*;

use crate::error::AuthError;
use crate::game::ParticipantId;

/// 資格情報トークンを検証し、参加者IDを返す
pub trait Authenticator: Send + Sync {
    fn verify(&self, token: &str) -> Result<ParticipantId, AuthError>;
}

/// 対戦相手の存在確認に使う利用者ディレクトリ
pub trait UserDirectory: Send + Sync {
    fn exists(&self, identity: &ParticipantId) -> bool;
}
