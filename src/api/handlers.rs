use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts},
    response::Json,
};
use std::sync::Arc;

use super::dto::{
    ApiError, ApiResult, GameHistoryResponse, GameStartRequest, HealthResponse, LeaderboardQuery,
    LeaderboardResponse, LoginRequest, MoveRequest, MoveResponse, RegisterRequest, TokenResponse,
    WebsocketInfoResponse,
};
use super::service::SessionCoordinator;
use crate::{
    ai::create_policy,
    auth::{Authenticator, JwtAuthenticator, UserDirectory, UserStore},
    config::Config,
    error::AuthError,
    game::{ParticipantId, SessionId},
    session::{NotificationHub, SessionStore},
    stats::{StaticStatsProvider, StatsProvider},
};

/// ハンドラ間で共有するアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    pub users: Arc<UserStore>,
    pub authenticator: Arc<JwtAuthenticator>,
    pub stats: Arc<dyn StatsProvider>,
    pub leaderboard_limit: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("coordinator", &self.coordinator)
            .field("users", &self.users.user_count())
            .field("leaderboard_limit", &self.leaderboard_limit)
            .finish()
    }
}

impl AppState {
    /// 設定から全コンポーネントを組み立てる
    pub fn new(config: &Config) -> Self {
        Self::with_stats(config, Arc::new(StaticStatsProvider::sample()))
    }

    pub fn with_stats(config: &Config, stats: Arc<dyn StatsProvider>) -> Self {
        let users = Arc::new(UserStore::new());
        let directory: Arc<dyn UserDirectory> = users.clone();
        let coordinator = SessionCoordinator::new(
            SessionStore::new(config.sessions.max_sessions),
            NotificationHub::new(config.notifications.subscriber_buffer),
            Arc::from(create_policy(config.sessions.opponent_policy)),
            directory,
        );

        Self {
            coordinator: Arc::new(coordinator),
            users,
            authenticator: Arc::new(JwtAuthenticator::new(&config.auth)),
            stats,
            leaderboard_limit: config.leaderboard.default_limit,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Bearerトークンから解決した呼び出し元
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ParticipantId);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let identity = state.authenticator.verify(token)?;
        Ok(AuthenticatedUser(identity))
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Healthy".to_string(),
    })
}

pub async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Tic-Tac-Toe API Server is running".to_string(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.users.register(&payload.email, &payload.username, &payload.password)?;
    let token = state.authenticator.issue(&user.username)?;
    Ok(Json(TokenResponse::bearer(token)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.users.authenticate(&payload.email, &payload.password)?;
    let token = state.authenticator.issue(&user.username)?;
    tracing::debug!(username = %user.username, "login succeeded");
    Ok(Json(TokenResponse::bearer(token)))
}

pub async fn new_game(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(payload): Json<GameStartRequest>,
) -> ApiResult<Json<SessionId>> {
    let session_id = state.coordinator.start_session(&identity, payload.opponent())?;
    Ok(Json(session_id))
}

pub async fn make_move(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(payload): Json<MoveRequest>,
) -> ApiResult<Json<MoveResponse>> {
    let result = state
        .coordinator
        .submit_move(&identity, payload.game_id, payload.row, payload.col)
        .await?;
    Ok(Json(result.into()))
}

pub async fn game_state(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(game_id): Path<SessionId>,
) -> ApiResult<Json<MoveResponse>> {
    let result = state.coordinator.get_session_state(game_id).await?;
    Ok(Json(result.into()))
}

pub async fn game_history(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Json<GameHistoryResponse> {
    let history = state.coordinator.get_history(&identity).await;
    Json(GameHistoryResponse { history })
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let limit = query.limit.unwrap_or(state.leaderboard_limit);
    let leaderboard = state.stats.top_players(limit).await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

pub async fn websocket_info() -> Json<WebsocketInfoResponse> {
    Json(WebsocketInfoResponse {
        message: "WebSocket endpoint is available at /ws/game/{game_id}".to_string(),
        description: "Connect to receive real-time game state updates. \
                      Send \"ping\" to receive \"pong\"; \
                      any other text returns the current game state."
            .to_string(),
    })
}
