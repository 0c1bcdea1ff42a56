//! インメモリの利用者アカウントストア
//! メールアドレスとユーザー名の一意性を保ち、パスワードはSHA-256ハッシュで保持する。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::UserDirectory;
use crate::error::AuthError;
use crate::game::ParticipantId;

/// パスワードの最小文字数
pub const MIN_PASSWORD_LEN: usize = 6;

/// 登録済みの利用者
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub email: String,
    password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId::new(self.username.clone())
    }
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// 利用者アカウントの管理を行う
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    /// メールアドレス → 利用者
    users: Arc<DashMap<String, UserRecord>>,
    /// ユーザー名 → メールアドレス
    usernames: Arc<DashMap<String, String>>,
    next_id: Arc<AtomicU64>,
    /// 一意性チェックと登録をまとめて行うためのロック
    registration: Arc<Mutex<()>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい利用者を登録する
    pub fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let email = email.trim().to_lowercase();
        let username = username.trim().to_string();

        if !email.contains('@') {
            return Err(AuthError::InvalidRegistration {
                reason: format!("invalid email address: {}", email),
            });
        }
        if username.is_empty() {
            return Err(AuthError::InvalidRegistration {
                reason: "username must not be empty".to_string(),
            });
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidRegistration {
                reason: format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }

        let _guard = self.registration.lock().map_err(|_| AuthError::InvalidRegistration {
            reason: "account store unavailable".to_string(),
        })?;

        if self.users.contains_key(&email) {
            return Err(AuthError::EmailTaken);
        }
        if self.usernames.contains_key(&username) {
            return Err(AuthError::UsernameTaken);
        }

        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: username.clone(),
            email: email.clone(),
            password_hash: hash_password(password),
            created_at: Utc::now(),
        };
        self.usernames.insert(username, email.clone());
        self.users.insert(email, record.clone());

        tracing::info!(user_id = record.id, username = %record.username, "user registered");
        Ok(record)
    }

    /// メールアドレスとパスワードで認証する
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let email = email.trim().to_lowercase();
        match self.users.get(&email) {
            Some(user) if user.password_hash == hash_password(password) => Ok(user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        let email = self.usernames.get(username)?.value().clone();
        self.users.get(&email).map(|user| user.clone())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl UserDirectory for UserStore {
    fn exists(&self, identity: &ParticipantId) -> bool {
        self.usernames.contains_key(identity.as_str())
    }
}
