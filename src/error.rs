//! アプリケーション全体のエラー定義モジュール
//! セッション操作、AI方策、認証、統計取得のエラーを統一管理。

use thiserror::Error;

use crate::game::{ParticipantId, SessionId};

/// セッション操作に関連するエラー
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    #[error("{identity} is not a player in game {session_id}")]
    NotAParticipant { identity: ParticipantId, session_id: SessionId },

    #[error("Opponent not found: {username}")]
    OpponentNotFound { username: String },

    #[error("Cannot start a game against yourself")]
    SelfOpponent,

    #[error("Coordinates out of range: ({row}, {col}). Valid range: 0-2")]
    MalformedCoordinates { row: i64, col: i64 },

    #[error("Session limit exceeded (max: {max})")]
    SessionLimitExceeded { max: usize },

    #[error("AI policy failed: {source}")]
    Policy {
        #[from]
        source: PolicyError,
    },
}

/// AI方策に関連するエラー
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("No empty cell available")]
    NoEmptyCell,

    #[error("Policy chose an occupied cell: ({row}, {col})")]
    OccupiedCell { row: usize, col: usize },
}

/// 認証・アカウント管理に関連するエラー
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid registration: {reason}")]
    InvalidRegistration { reason: String },

    #[error("Token encoding failed: {message}")]
    Encoding { message: String },
}

/// 統計ストアに関連するエラー
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Stats provider unavailable: {reason}")]
    Unavailable { reason: String },
}

/// セッションエラーをベースとした結果型
pub type SessionResult<T> = std::result::Result<T, SessionError>;
