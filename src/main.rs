//! Tic-Tac-Toe APIサーバーのエントリポイント
//! 設定読み込み、ログ初期化、サービス組み立て、HTTPサーバー起動を行う。

use TicTacToe::{
    api::{create_router, AppState},
    config::Config,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const GENERATED_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--generate-config") {
        match Config::default().save_to_file(GENERATED_CONFIG_PATH) {
            Ok(()) => println!("デフォルト設定を生成しました: {}", GENERATED_CONFIG_PATH),
            Err(e) => {
                eprintln!("設定ファイル生成失敗: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // 設定ファイルと環境変数から統合設定を読み込み
    let config = match Config::load().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("設定エラー: {}", e);
            eprintln!("デフォルト設定を生成: cargo run -- --generate-config");
            std::process::exit(1);
        }
    };

    // RUST_LOGが優先、未設定なら設定ファイルのログレベル
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        max_sessions = config.sessions.max_sessions,
        opponent_policy = ?config.sessions.opponent_policy,
        "configuration loaded"
    );

    let state = AppState::new(&config);
    let app = create_router(&config.server).with_state(state);

    let bind_address = config.bind_address();
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "failed to bind address");
            std::process::exit(1);
        }
    };

    tracing::info!(address = %bind_address, "Tic-Tac-Toe API server started");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
