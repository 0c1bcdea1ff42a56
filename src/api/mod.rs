//! HTTP/WebSocketアダプタ
//! 対局進行サービス（SessionCoordinator）と、それを公開するルーティングを提供する。

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod ws;

pub use handlers::AppState;
pub use routes::create_router;
pub use service::{MoveResult, MoveStatus, OpponentChoice, SessionCoordinator};
