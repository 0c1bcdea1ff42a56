//! 対局セッションストアモジュール
//! 進行中・終了済みの全セッションを保持し、
//! セッション単位の排他ロックによる更新と参加者ごとの履歴管理を担当する。

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{SessionError, SessionResult};
use crate::game::{Participant, ParticipantId, Session, SessionId};

/// セッションの管理を行うメイン構造体
/// セッションごとに独立したMutexを持ち、異なるセッション同士は互いにブロックしない
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// 全セッションのコレクション
    sessions: Arc<DashMap<SessionId, Arc<Mutex<Session>>>>,
    /// 参加者ごとのセッションID一覧
    history: Arc<DashMap<ParticipantId, Vec<SessionId>>>,
    /// ID採番カウンタ（セッションロックとは独立）
    next_id: Arc<AtomicU64>,
    /// 進行中のセッション数。終局したセッションは数えない
    active: Arc<AtomicUsize>,
    /// 同時に進行できる最大セッション数（0は無制限）
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            history: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            active: Arc::new(AtomicUsize::new(0)),
            max_sessions,
        }
    }

    /// 進行中セッションの枠を1つ確保する
    fn reserve_slot(&self) -> SessionResult<()> {
        let max = self.max_sessions;
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (max == 0 || active < max).then_some(active + 1)
            })
            .map(|_| ())
            .map_err(|_| SessionError::SessionLimitExceeded { max })
    }

    fn release_slot(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| active.checked_sub(1));
    }

    /// 新しいセッションを作成する
    /// 空の盤面、X手番で初期化し、人間の参加者の履歴に登録する
    pub fn create_session(
        &self,
        first: ParticipantId,
        second: Participant,
    ) -> SessionResult<SessionId> {
        self.reserve_slot()?;

        let session_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut tracked = vec![first.clone()];
        if let Participant::Human(id) = &second {
            tracked.push(id.clone());
        }

        let session = Session::new(session_id, first, second);
        self.sessions.insert(session_id, Arc::new(Mutex::new(session)));

        for participant in tracked {
            self.history.entry(participant).or_default().push(session_id);
        }

        tracing::debug!(session_id, "session registered");
        Ok(session_id)
    }

    fn handle(&self, session_id: SessionId) -> SessionResult<Arc<Mutex<Session>>> {
        // DashMapのガードはawaitをまたいで保持しない
        self.sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::SessionNotFound { session_id })
    }

    /// 指定したIDのセッションの複製を取得する
    pub async fn get_session(&self, session_id: SessionId) -> SessionResult<Session> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// セッションを排他ロックした状態で更新関数を実行する
    /// セッションを変更する唯一の経路。ロックは関数の戻りやパニックでも必ず解放される
    /// 更新で終局した場合は進行中の枠を返却する
    pub async fn with_session_locked<F, R>(&self, session_id: SessionId, f: F) -> SessionResult<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        let was_finished = session.is_finished();
        let result = f(&mut session);
        if !was_finished && session.is_finished() {
            self.release_slot();
        }
        Ok(result)
    }

    /// 参加者のセッションIDを作成順で返す
    pub fn list_sessions_for_participant(&self, identity: &ParticipantId) -> Vec<SessionId> {
        let mut ids = self
            .history
            .get(identity)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        // 並行作成時に登録順と採番順が入れ替わりうるため採番順に揃える
        ids.sort_unstable();
        ids
    }

    pub fn session_exists(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// 終局済みを含む保持中の全セッション数
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(0)
    }
}
