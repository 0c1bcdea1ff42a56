//! 対局進行サービス
//! 着手要求を受けて参加者確認、ルール適用、AI応手、状態保存、通知配信までを
//! 1つのセッションロック内でまとめて処理する。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::ai::OpponentPolicy;
use crate::auth::UserDirectory;
use crate::error::{PolicyError, SessionError, SessionResult};
use crate::game::{
    Mark, Outcome, Participant, ParticipantId, Position, Session, SessionId, SessionSnapshot,
    TicTacToeRules,
};
use crate::session::{NotificationHub, SessionStore, SubscriberId};

/// 着手結果の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStatus {
    Continue,
    Won,
    Draw,
    Invalid,
}

impl MoveStatus {
    fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::InProgress => MoveStatus::Continue,
            Outcome::Won(_) => MoveStatus::Won,
            Outcome::Draw => MoveStatus::Draw,
        }
    }
}

/// 着手・状態取得の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub snapshot: SessionSnapshot,
    pub status: MoveStatus,
    pub message: Option<String>,
    /// 同じ要求内で適用されたAIの応手
    pub automated_move: Option<Position>,
}

impl MoveResult {
    fn invalid(session: &Session, message: &str) -> Self {
        Self {
            snapshot: session.snapshot(),
            status: MoveStatus::Invalid,
            message: Some(message.to_string()),
            automated_move: None,
        }
    }

    fn view(session: &Session) -> Self {
        Self {
            snapshot: session.snapshot(),
            status: MoveStatus::from_outcome(session.outcome),
            message: None,
            automated_move: None,
        }
    }
}

/// 対戦相手の指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpponentChoice {
    Human(String),
    Automated,
}

/// 履歴一覧の1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    #[serde(rename = "game_id")]
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    /// 終局時の最終着手時刻
    pub completed_at: Option<DateTime<Utc>>,
    pub players: Vec<String>,
    pub winner: Option<Mark>,
    #[serde(rename = "moves_count")]
    pub move_count: usize,
}

/// リアルタイム購読の開始結果
#[derive(Debug)]
pub struct Subscription {
    pub subscriber_id: SubscriberId,
    pub receiver: mpsc::Receiver<SessionSnapshot>,
    /// 購読開始時点の状態
    pub snapshot: SessionSnapshot,
}

/// 座標を検証してPositionに変換する
pub fn validate_position(row: i64, col: i64) -> SessionResult<Position> {
    let to_index = |value: i64| usize::try_from(value).ok();
    to_index(row)
        .zip(to_index(col))
        .and_then(|(r, c)| Position::new(r, c))
        .ok_or(SessionError::MalformedCoordinates { row, col })
}

pub struct SessionCoordinator {
    store: SessionStore,
    hub: NotificationHub,
    policy: Arc<dyn OpponentPolicy>,
    users: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("store", &self.store)
            .field("hub", &self.hub)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl SessionCoordinator {
    pub fn new(
        store: SessionStore,
        hub: NotificationHub,
        policy: Arc<dyn OpponentPolicy>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            store,
            hub,
            policy,
            users,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// 新しい対局を開始する
    /// 人間の相手は登録済みである必要がある
    pub fn start_session(
        &self,
        first: &ParticipantId,
        opponent: OpponentChoice,
    ) -> SessionResult<SessionId> {
        let second = match opponent {
            OpponentChoice::Automated => Participant::Automated,
            OpponentChoice::Human(username) => {
                let identity = ParticipantId::new(username.clone());
                if &identity == first {
                    return Err(SessionError::SelfOpponent);
                }
                if !self.users.exists(&identity) {
                    return Err(SessionError::OpponentNotFound { username });
                }
                Participant::Human(identity)
            }
        };

        let opponent_name = second.display_name().to_string();
        let session_id = self.store.create_session(first.clone(), second)?;
        tracing::info!(session_id, first = %first, opponent = %opponent_name, "session started");
        Ok(session_id)
    }

    /// 着手要求を処理する
    /// AIの応手、状態保存、通知配信までを同じセッションロック内で行う
    pub async fn submit_move(
        &self,
        identity: &ParticipantId,
        session_id: SessionId,
        row: i64,
        col: i64,
    ) -> SessionResult<MoveResult> {
        let position = validate_position(row, col)?;
        let policy = self.policy.as_ref();
        let hub = &self.hub;

        self.store
            .with_session_locked(session_id, |session| {
                Self::play_turn(session, identity, position, policy, hub)
            })
            .await?
    }

    fn play_turn(
        session: &mut Session,
        identity: &ParticipantId,
        position: Position,
        policy: &dyn OpponentPolicy,
        hub: &NotificationHub,
    ) -> SessionResult<MoveResult> {
        let mark = session.mark_for(identity).ok_or_else(|| SessionError::NotAParticipant {
            identity: identity.clone(),
            session_id: session.id,
        })?;

        if session.is_finished() {
            return Ok(MoveResult::invalid(session, "Game is already finished."));
        }

        let applied = TicTacToeRules::apply_move(&session.board, position, mark, session.next_turn);
        if !applied.accepted {
            return Ok(MoveResult::invalid(
                session,
                "Invalid move! Cell already taken or not your turn.",
            ));
        }

        // 全体が成功した場合のみセッションへ反映する
        let mut working = session.clone();
        working.record_move(position, mark, applied.board);
        tracing::debug!(
            session_id = working.id,
            %identity,
            %mark,
            row = position.row(),
            col = position.col(),
            "move applied"
        );

        let mut automated_move = None;
        if !working.is_finished() && working.is_automated_turn() {
            let reply_mark = working.next_turn;
            let reply = policy.choose_move(&working.board, reply_mark)?;
            let turn = working.next_turn;
            let applied = TicTacToeRules::apply_move(&working.board, reply, reply_mark, turn);
            if !applied.accepted {
                return Err(PolicyError::OccupiedCell {
                    row: reply.row(),
                    col: reply.col(),
                }
                .into());
            }
            working.record_move(reply, reply_mark, applied.board);
            automated_move = Some(reply);
            tracing::debug!(
                session_id = working.id,
                row = reply.row(),
                col = reply.col(),
                "automated reply applied"
            );
        }

        *session = working;

        let snapshot = session.snapshot();
        hub.publish(session.id, &snapshot);

        let status = MoveStatus::from_outcome(session.outcome);
        let automated_note =
            automated_move.map(|p| format!("AI played at row={}, col={}", p.row(), p.col()));
        let message = match session.outcome {
            Outcome::Won(winner) => {
                tracing::info!(session_id = session.id, %winner, "session won");
                match &automated_note {
                    Some(note) => format!("Winner is {}. {}", winner, note),
                    None => format!("Winner is {}", winner),
                }
            }
            Outcome::Draw => {
                tracing::info!(session_id = session.id, "session drawn");
                "It's a draw.".to_string()
            }
            Outcome::InProgress => match &automated_note {
                Some(note) => format!("Continue playing. {}", note),
                None => "Continue playing.".to_string(),
            },
        };

        Ok(MoveResult {
            snapshot,
            status,
            message: Some(message),
            automated_move,
        })
    }

    /// 現在の対局状態を取得する
    pub async fn get_session_state(&self, session_id: SessionId) -> SessionResult<MoveResult> {
        let session = self.store.get_session(session_id).await?;
        Ok(MoveResult::view(&session))
    }

    /// 参加者の対局履歴を作成順で返す
    pub async fn get_history(&self, identity: &ParticipantId) -> Vec<HistoryItem> {
        let mut history = Vec::new();
        for session_id in self.store.list_sessions_for_participant(identity) {
            if let Ok(session) = self.store.get_session(session_id).await {
                history.push(HistoryItem {
                    session_id: session.id,
                    started_at: session.created_at,
                    completed_at: session.is_finished().then_some(session.last_move_at),
                    players: session.players(),
                    winner: session.winner(),
                    move_count: session.move_count(),
                });
            }
        }
        history
    }

    /// セッションのリアルタイム更新を購読する
    /// 購読登録と現在状態の取得を同じロック内で行い、更新の取りこぼしを防ぐ
    pub async fn subscribe(&self, session_id: SessionId) -> SessionResult<Subscription> {
        let hub = &self.hub;
        self.store
            .with_session_locked(session_id, |session| {
                let (subscriber_id, receiver) = hub.open_channel(session_id);
                Subscription {
                    subscriber_id,
                    receiver,
                    snapshot: session.snapshot(),
                }
            })
            .await
    }

    pub fn unsubscribe(&self, session_id: SessionId, subscriber_id: SubscriberId) {
        self.hub.unsubscribe(session_id, subscriber_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FirstAvailablePolicy;
    use crate::auth::UserStore;
    use crate::game::Board;

    /// 常に(0,0)を返す不正な方策
    struct StuckPolicy;

    impl OpponentPolicy for StuckPolicy {
        fn choose_move(&self, _board: &Board, _mark: Mark) -> Result<Position, PolicyError> {
            Ok(Position::new(0, 0).unwrap())
        }

        fn name(&self) -> &'static str {
            "StuckPolicy"
        }
    }

    fn users() -> Arc<UserStore> {
        let users = Arc::new(UserStore::new());
        users.register("alice@example.com", "alice", "secret1").unwrap();
        users.register("bob@example.com", "bob", "secret1").unwrap();
        users
    }

    fn coordinator_with(policy: Arc<dyn OpponentPolicy>) -> SessionCoordinator {
        SessionCoordinator::new(SessionStore::default(), NotificationHub::new(8), policy, users())
    }

    fn coordinator() -> SessionCoordinator {
        coordinator_with(Arc::new(FirstAvailablePolicy))
    }

    fn alice() -> ParticipantId {
        ParticipantId::new("alice")
    }

    fn bob() -> ParticipantId {
        ParticipantId::new("bob")
    }

    #[test]
    fn test_validate_position() {
        assert!(validate_position(0, 0).is_ok());
        assert!(validate_position(2, 2).is_ok());
        assert!(matches!(
            validate_position(3, 0),
            Err(SessionError::MalformedCoordinates { row: 3, col: 0 })
        ));
        assert!(matches!(validate_position(-1, 1), Err(SessionError::MalformedCoordinates { .. })));
    }

    #[tokio::test]
    async fn test_start_session_against_unknown_opponent() {
        let coordinator = coordinator();
        let result = coordinator
            .start_session(&alice(), OpponentChoice::Human("nobody".to_string()));
        assert!(matches!(result, Err(SessionError::OpponentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_start_session_against_self() {
        let coordinator = coordinator();
        let result = coordinator
            .start_session(&alice(), OpponentChoice::Human("alice".to_string()));
        assert!(matches!(result, Err(SessionError::SelfOpponent)));
    }

    #[tokio::test]
    async fn test_first_move_continues() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();

        let result = coordinator.submit_move(&alice(), id, 0, 0).await.unwrap();

        assert_eq!(result.status, MoveStatus::Continue);
        assert_eq!(result.snapshot.board[0], vec![Some(Mark::X), None, None]);
        assert_eq!(result.snapshot.next_turn, Some(Mark::O));
        assert_eq!(result.message.as_deref(), Some("Continue playing."));
    }

    #[tokio::test]
    async fn test_out_of_turn_move_is_invalid_and_unchanged() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();

        let result = coordinator.submit_move(&bob(), id, 1, 1).await.unwrap();

        assert_eq!(result.status, MoveStatus::Invalid);
        assert_eq!(result.snapshot.next_turn, Some(Mark::X));
        let session = coordinator.store().get_session(id).await.unwrap();
        assert_eq!(session.move_count(), 0);
    }

    #[tokio::test]
    async fn test_left_column_win() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();

        coordinator.submit_move(&alice(), id, 0, 0).await.unwrap();
        coordinator.submit_move(&bob(), id, 0, 1).await.unwrap();
        coordinator.submit_move(&alice(), id, 1, 0).await.unwrap();
        coordinator.submit_move(&bob(), id, 1, 1).await.unwrap();
        let result = coordinator.submit_move(&alice(), id, 2, 0).await.unwrap();

        assert_eq!(result.status, MoveStatus::Won);
        assert_eq!(result.snapshot.winner, Some(Mark::X));
        assert_eq!(result.snapshot.next_turn, None);
        assert_eq!(result.message.as_deref(), Some("Winner is X"));

        let after = coordinator.submit_move(&bob(), id, 2, 2).await.unwrap();
        assert_eq!(after.status, MoveStatus::Invalid);
    }

    #[tokio::test]
    async fn test_draw() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();
        // X O X / X O O / O X X
        let moves = [
            (alice(), 0, 0),
            (bob(), 0, 1),
            (alice(), 0, 2),
            (bob(), 1, 1),
            (alice(), 1, 0),
            (bob(), 1, 2),
            (alice(), 2, 1),
            (bob(), 2, 0),
        ];
        for (player, row, col) in moves {
            let result = coordinator.submit_move(&player, id, row, col).await.unwrap();
            assert_eq!(result.status, MoveStatus::Continue);
        }

        let result = coordinator.submit_move(&alice(), id, 2, 2).await.unwrap();
        assert_eq!(result.status, MoveStatus::Draw);
        assert_eq!(result.snapshot.winner, None);
        assert_eq!(result.message.as_deref(), Some("It's a draw."));
    }

    #[tokio::test]
    async fn test_automated_reply_in_same_request() {
        let coordinator = coordinator();
        let id = coordinator.start_session(&alice(), OpponentChoice::Automated).unwrap();

        let result = coordinator.submit_move(&alice(), id, 1, 1).await.unwrap();

        assert_eq!(result.status, MoveStatus::Continue);
        assert_eq!(result.snapshot.board[1][1], Some(Mark::X));
        assert_eq!(result.snapshot.board[0][0], Some(Mark::O));
        assert_eq!(result.snapshot.next_turn, Some(Mark::X));
        assert_eq!(result.automated_move, Position::new(0, 0));
        assert!(result.message.unwrap().contains("AI played at row=0, col=0"));

        let session = coordinator.store().get_session(id).await.unwrap();
        assert_eq!(session.move_count(), 2);
        assert_eq!(session.moves[1].player, Participant::Automated);
    }

    #[tokio::test]
    async fn test_finished_game_frees_session_slot() {
        let coordinator = SessionCoordinator::new(
            SessionStore::new(1),
            NotificationHub::new(8),
            Arc::new(FirstAvailablePolicy),
            users(),
        );
        let id = coordinator.start_session(&alice(), OpponentChoice::Automated).unwrap();
        assert!(matches!(
            coordinator.start_session(&bob(), OpponentChoice::Automated),
            Err(SessionError::SessionLimitExceeded { max: 1 })
        ));

        // AIは左上から順に置くため、中段を揃えて勝つ
        coordinator.submit_move(&alice(), id, 1, 0).await.unwrap();
        coordinator.submit_move(&alice(), id, 1, 1).await.unwrap();
        let result = coordinator.submit_move(&alice(), id, 1, 2).await.unwrap();
        assert_eq!(result.status, MoveStatus::Won);

        assert_eq!(coordinator.store().active_session_count(), 0);
        assert!(coordinator.start_session(&bob(), OpponentChoice::Automated).is_ok());
    }

    #[tokio::test]
    async fn test_non_participant_rejected() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();

        let result = coordinator.submit_move(&ParticipantId::new("mallory"), id, 0, 0).await;

        assert!(matches!(result, Err(SessionError::NotAParticipant { .. })));
        let session = coordinator.store().get_session(id).await.unwrap();
        assert_eq!(session.move_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let coordinator = coordinator();
        let result = coordinator.submit_move(&alice(), 404, 0, 0).await;
        assert!(matches!(result, Err(SessionError::SessionNotFound { session_id: 404 })));
    }

    #[tokio::test]
    async fn test_faulty_policy_leaves_session_unchanged() {
        let coordinator = coordinator_with(Arc::new(StuckPolicy));
        let id = coordinator.start_session(&alice(), OpponentChoice::Automated).unwrap();

        let result = coordinator.submit_move(&alice(), id, 0, 0).await;

        assert!(matches!(result, Err(SessionError::Policy { .. })));
        let session = coordinator.store().get_session(id).await.unwrap();
        assert_eq!(session.move_count(), 0);
        assert_eq!(session.next_turn, Mark::X);
    }

    #[tokio::test]
    async fn test_accepted_move_is_published() {
        let coordinator = coordinator();
        let id = coordinator
            .start_session(&alice(), OpponentChoice::Human("bob".to_string()))
            .unwrap();
        let mut subscription = coordinator.subscribe(id).await.unwrap();
        assert_eq!(subscription.snapshot.next_turn, Some(Mark::X));

        coordinator.submit_move(&bob(), id, 0, 0).await.unwrap();
        assert!(subscription.receiver.try_recv().is_err());

        coordinator.submit_move(&alice(), id, 0, 0).await.unwrap();
        let pushed = subscription.receiver.recv().await.unwrap();
        assert_eq!(pushed.board[0][0], Some(Mark::X));
        assert_eq!(pushed.next_turn, Some(Mark::O));

        coordinator.unsubscribe(id, subscription.subscriber_id);
        assert_eq!(coordinator.hub().subscriber_count(id), 0);
    }

    #[tokio::test]
    async fn test_history() {
        let coordinator = coordinator();
        let first = coordinator.start_session(&alice(), OpponentChoice::Automated).unwrap();
        let second = coordinator
            .start_session(&bob(), OpponentChoice::Human("alice".to_string()))
            .unwrap();
        coordinator.submit_move(&alice(), first, 0, 2).await.unwrap();

        let history = coordinator.get_history(&alice()).await;

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].session_id, first);
        assert_eq!(history[0].players, vec!["alice".to_string(), "AI".to_string()]);
        assert_eq!(history[0].move_count, 2);
        assert!(history[0].completed_at.is_none());
        assert_eq!(history[1].session_id, second);
        assert_eq!(history[1].players, vec!["bob".to_string(), "alice".to_string()]);
        assert!(coordinator.get_history(&ParticipantId::new("carol")).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_session_state() {
        let coordinator = coordinator();
        let id = coordinator.start_session(&alice(), OpponentChoice::Automated).unwrap();

        let state = coordinator.get_session_state(id).await.unwrap();
        assert_eq!(state.status, MoveStatus::Continue);
        assert_eq!(state.snapshot.next_turn, Some(Mark::X));
        assert!(matches!(
            coordinator.get_session_state(id + 1).await,
            Err(SessionError::SessionNotFound { .. })
        ));
    }
}
