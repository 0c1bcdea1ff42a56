//! JWTによるトークン発行と検証
//! HS256署名、subjectにユーザー名を格納する。

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use super::Authenticator;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::game::ParticipantId;

/// トークンに含めるクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// ユーザー名
    pub sub: String,
    /// 有効期限（Unix秒）
    pub exp: i64,
    /// 発行時刻（Unix秒）
    pub iat: i64,
}

/// HS256トークンの発行と検証を行う
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expire_minutes: i64,
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("expire_minutes", &self.expire_minutes)
            .finish()
    }
}

impl JwtAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expire_minutes: config.token_expire_minutes,
        }
    }

    /// 指定ユーザーのアクセストークンを発行する
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.expire_minutes)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding { message: e.to_string() })
    }
}

/// JWTライブラリのエラーを認証エラーに変換する
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    }
}

impl Authenticator for JwtAuthenticator {
    fn verify(&self, token: &str) -> Result<ParticipantId, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(ParticipantId::new(data.claims.sub))
    }
}
