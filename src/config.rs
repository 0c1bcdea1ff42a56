//! アプリケーション設定管理モジュール
//! サーバー、認証、セッション、通知、ランキングの設定を
//! 設定ファイルと環境変数から読み込んで管理する。

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, str::FromStr};

use crate::ai::PolicyKind;

/// 設定ファイルの探索順
const CONFIG_PATHS: [&str; 3] = ["config.json", "config/app.json", "/etc/tictactoe/config.json"];

/// サーバーの設定を管理する構造体
/// ポート番号、ホスト名、CORS設定、ログレベルなどを含む
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub enable_cors: bool,
    pub enable_logging: bool,
    /// RUST_LOG未設定時に使うフィルタ
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            enable_cors: true,
            enable_logging: true,
            log_level: "info".to_string(),
        }
    }
}

/// トークン発行と検証の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256署名用の秘密鍵
    pub jwt_secret: String,
    pub token_expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "tictactoe-secret".to_string(),
            token_expire_minutes: 120,
        }
    }
}

/// セッション管理の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 保持する最大セッション数（0は無制限）
    pub max_sessions: usize,
    /// AI対戦で使う方策
    pub opponent_policy: PolicyKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            opponent_policy: PolicyKind::FirstAvailable,
        }
    }
}

/// リアルタイム通知の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 購読者ごとの送信バッファ数。溢れた購読者は切断される
    pub subscriber_buffer: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { subscriber_buffer: 16 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    pub default_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

/// アプリケーションの全設定を統合するメイン設定構造体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub sessions: SessionConfig,
    pub notifications: NotificationConfig,
    pub leaderboard: LeaderboardConfig,
}

/// 設定関連のエラーを表すenum
/// ファイル読み込み、パース、検証エラーなどを含む
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("設定ファイル読み込みエラー: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("設定ファイル解析エラー: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("環境変数エラー: {name} = {value}")]
    EnvVarError { name: String, value: String },

    #[error("設定値が無効です: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

/// 環境変数を読み、設定されていればパースして返す
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarError {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// 指定したファイルパスから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 環境変数で既存の設定を上書きする
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_parse::<String>("SERVER_HOST")? {
            self.server.host = host;
        }
        if let Some(port) = env_parse("SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(level) = env_parse::<String>("LOG_LEVEL")? {
            self.server.log_level = level;
        }
        if let Some(secret) = env_parse::<String>("JWT_SECRET")? {
            self.auth.jwt_secret = secret;
        }
        if let Some(minutes) = env_parse("TOKEN_EXPIRE_MINUTES")? {
            self.auth.token_expire_minutes = minutes;
        }
        if let Some(max_sessions) = env_parse("MAX_SESSIONS")? {
            self.sessions.max_sessions = max_sessions;
        }
        if let Some(policy) = env_parse("OPPONENT_POLICY")? {
            self.sessions.opponent_policy = policy;
        }
        if let Some(buffer) = env_parse("SUBSCRIBER_BUFFER")? {
            self.notifications.subscriber_buffer = buffer;
        }
        Ok(())
    }

    /// デフォルト値をベースに環境変数で上書きした設定を返す
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 設定ファイルと環境変数を結合して設定を読み込む
    /// 設定ファイルがなくてもデフォルト値で動作する
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = CONFIG_PATHS
            .iter()
            .find_map(|path| Self::from_file(path).ok())
            .unwrap_or_default();

        config.apply_env()?;
        Ok(config)
    }

    /// 現在の設定を指定したファイルに保存する
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定値の妥当性をチェックする
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: self.server.port.to_string(),
            });
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.jwt_secret".to_string(),
                value: String::new(),
            });
        }

        if self.auth.token_expire_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_expire_minutes".to_string(),
                value: self.auth.token_expire_minutes.to_string(),
            });
        }

        if self.notifications.subscriber_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.subscriber_buffer".to_string(),
                value: self.notifications.subscriber_buffer.to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
