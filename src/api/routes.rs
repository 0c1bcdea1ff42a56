use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::{
    handlers::{
        game_history, game_state, health_check, leaderboard, login, make_move, new_game, register,
        root, websocket_info, AppState,
    },
    middleware::{cors, logging},
    ws::game_updates,
};
use crate::config::ServerConfig;

/// 全エンドポイントのルーターを作成する
/// CORSとアクセスログは設定で有効なときのみ適用する
pub fn create_router(config: &ServerConfig) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/new_game", post(new_game))
        .route("/make_move", post(make_move))
        .route("/game_state/:game_id", get(game_state))
        .route("/game_history", get(game_history))
        .route("/leaderboard", get(leaderboard))
        .route("/websocket_info", get(websocket_info))
        .route("/ws/game/:game_id", get(game_updates));

    if config.enable_cors {
        router = router.layer(middleware::from_fn(cors));
    }
    if config.enable_logging {
        router = router.layer(middleware::from_fn(logging));
    }

    router
}
