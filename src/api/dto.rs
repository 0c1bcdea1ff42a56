//! HTTP API用のデータ転送オブジェクト
//! リクエスト/レスポンス型とエラーレスポンスへの変換を定義する。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::service::{HistoryItem, MoveResult, MoveStatus, OpponentChoice};
use crate::error::{AuthError, SessionError, StatsError};
use crate::game::{Mark, SessionId};
use crate::stats::LeaderboardEntry;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// 対戦相手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpponentType {
    Human,
    Ai,
}

#[derive(Debug, Deserialize)]
pub struct GameStartRequest {
    pub opponent_type: OpponentType,
    pub opponent_username: Option<String>,
}

impl GameStartRequest {
    /// 相手ユーザー名のない人間対戦はAI対戦として扱う
    pub fn opponent(&self) -> OpponentChoice {
        match (self.opponent_type, &self.opponent_username) {
            (OpponentType::Human, Some(username)) if !username.trim().is_empty() => {
                OpponentChoice::Human(username.trim().to_string())
            }
            _ => OpponentChoice::Automated,
        }
    }
}

/// 座標は符号付きで受け取り、範囲外の値をサービス側で400にする
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub game_id: SessionId,
    pub row: i64,
    pub col: i64,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub board: Vec<Vec<Option<Mark>>>,
    pub status: MoveStatus,
    pub message: Option<String>,
    pub winner: Option<Mark>,
    pub next_turn: Option<Mark>,
}

impl From<MoveResult> for MoveResponse {
    fn from(result: MoveResult) -> Self {
        Self {
            board: result.snapshot.board,
            status: result.status,
            message: result.message,
            winner: result.snapshot.winner,
            next_turn: result.snapshot.next_turn,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GameHistoryResponse {
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct WebsocketInfoResponse {
    pub message: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub error_code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
            error_code: None,
        }
    }

    pub fn with_code(
        error: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
            error_code: Some(code.into()),
        }
    }
}

/// HTTP層のエラー
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Session(err) => match err {
                SessionError::SessionNotFound { .. } => "GAME_NOT_FOUND",
                SessionError::NotAParticipant { .. } => "NOT_A_PLAYER",
                SessionError::OpponentNotFound { .. } => "OPPONENT_NOT_FOUND",
                SessionError::SelfOpponent => "SELF_OPPONENT",
                SessionError::MalformedCoordinates { .. } => "INVALID_COORDINATES",
                SessionError::SessionLimitExceeded { .. } => "MAX_SESSIONS_REACHED",
                SessionError::Policy { .. } => "AI_ERROR",
            },
            ApiError::Auth(err) => match err {
                AuthError::MissingToken => "MISSING_TOKEN",
                AuthError::InvalidToken => "INVALID_TOKEN",
                AuthError::TokenExpired => "TOKEN_EXPIRED",
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::EmailTaken => "EMAIL_TAKEN",
                AuthError::UsernameTaken => "USERNAME_TAKEN",
                AuthError::InvalidRegistration { .. } => "INVALID_REGISTRATION",
                AuthError::Encoding { .. } => "INTERNAL_ERROR",
            },
            ApiError::Stats(_) => "STATS_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Session(err) => match err {
                SessionError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
                SessionError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
                SessionError::OpponentNotFound { .. } => StatusCode::NOT_FOUND,
                SessionError::SelfOpponent => StatusCode::BAD_REQUEST,
                SessionError::MalformedCoordinates { .. } => StatusCode::BAD_REQUEST,
                SessionError::SessionLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                SessionError::Policy { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(err) => match err {
                AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::InvalidRegistration { .. } => StatusCode::BAD_REQUEST,
                AuthError::Encoding { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Stats(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ApiError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: ApiError) -> Self {
        let status_code = err.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        let code = err.error_code();
        let error_response = ErrorResponse::with_code(code, err.to_string(), code);

        (status_code, Json(error_response))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body): (StatusCode, Json<ErrorResponse>) = self.into();
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
