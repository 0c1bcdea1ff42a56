//! リアルタイム通知ハブモジュール
//! セッションごとの購読者集合を管理し、状態変化のたびにスナップショットを配信する。
//! 配信は購読者ごとの有界チャネルへの非ブロッキング送信で行い、
//! 詰まった・切断済みの購読者は自動的に取り除く。

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::{SessionId, SessionSnapshot};

/// 購読者の識別子
pub type SubscriberId = Uuid;

/// 購読者への送信ハンドル
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub sender: mpsc::Sender<SessionSnapshot>,
}

impl Subscriber {
    pub fn new(sender: mpsc::Sender<SessionSnapshot>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }
}

/// セッションID → 購読者集合の対応を管理する
#[derive(Debug, Clone)]
pub struct NotificationHub {
    subscribers: Arc<DashMap<SessionId, HashMap<SubscriberId, Subscriber>>>,
    /// open_channelで作成するチャネルの容量
    buffer: usize,
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// 購読者を登録する（同じIDの再登録は上書き）
    pub fn subscribe(&self, session_id: SessionId, subscriber: Subscriber) {
        let subscriber_id = subscriber.id;
        self.subscribers
            .entry(session_id)
            .or_default()
            .insert(subscriber_id, subscriber);
        tracing::debug!(session_id, %subscriber_id, "subscriber joined");
    }

    /// 有界チャネルを作成して購読し、受信側を返す
    pub fn open_channel(
        &self,
        session_id: SessionId,
    ) -> (SubscriberId, mpsc::Receiver<SessionSnapshot>) {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let subscriber = Subscriber::new(sender);
        let subscriber_id = subscriber.id;
        self.subscribe(session_id, subscriber);
        (subscriber_id, receiver)
    }

    /// 購読を解除する。未登録のIDは何もしない
    pub fn unsubscribe(&self, session_id: SessionId, subscriber_id: SubscriberId) {
        let removed = self
            .subscribers
            .get_mut(&session_id)
            .and_then(|mut entry| entry.remove(&subscriber_id))
            .is_some();
        self.subscribers.remove_if(&session_id, |_, set| set.is_empty());

        if removed {
            tracing::debug!(session_id, %subscriber_id, "subscriber left");
        }
    }

    /// 全購読者にスナップショットを配信する
    /// 送信に失敗した購読者は取り除き、呼び出し側にはエラーを返さない
    pub fn publish(&self, session_id: SessionId, snapshot: &SessionSnapshot) {
        // 配信中の購読解除に備えて集合を複製してから送る
        let targets: Vec<Subscriber> = match self.subscribers.get(&session_id) {
            Some(entry) => entry.values().cloned().collect(),
            None => return,
        };

        let mut failed = Vec::new();
        for subscriber in &targets {
            if let Err(e) = subscriber.sender.try_send(snapshot.clone()) {
                tracing::debug!(
                    session_id, subscriber_id = %subscriber.id, error = %e,
                    "dropping slow or disconnected subscriber"
                );
                failed.push(subscriber.id);
            }
        }

        for subscriber_id in failed {
            self.unsubscribe(session_id, subscriber_id);
        }
    }

    pub fn subscriber_count(&self, session_id: SessionId) -> usize {
        self.subscribers
            .get(&session_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(16)
    }
}
