//! 対局セッション状態管理モジュール
//! 1局分の盤面、参加者、手番、手の履歴、終局結果を保持する。

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::board::Board;
use super::rules::{BoardOutcome, TicTacToeRules};
use super::types::{Mark, Participant, ParticipantId, Position};

/// セッションID（作成順に単調増加）
pub type SessionId = u64;

/// 対局の終局状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Won(Mark),
    Draw,
}

impl From<BoardOutcome> for Outcome {
    fn from(outcome: BoardOutcome) -> Self {
        match outcome {
            BoardOutcome::InProgress => Outcome::InProgress,
            BoardOutcome::Won(mark) => Outcome::Won(mark),
            BoardOutcome::Draw => Outcome::Draw,
        }
    }
}

/// 適用済みの1手
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub player: Participant,
    pub position: Position,
    pub mark: Mark,
    pub timestamp: DateTime<Utc>,
}

impl MoveRecord {
    pub fn new(player: Participant, position: Position, mark: Mark) -> Self {
        Self {
            player,
            position,
            mark,
            timestamp: Utc::now(),
        }
    }
}

/// 外部に公開する対局状態のスナップショット
/// リアルタイム配信とAPIレスポンスの両方で使用する
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub board: Vec<Vec<Option<Mark>>>,
    /// 終局後はNone
    pub next_turn: Option<Mark>,
    pub winner: Option<Mark>,
}

/// 1局分のセッション
/// 先手（X）は常に作成者、後手（O）は人間またはAI
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub first: ParticipantId,
    pub second: Participant,
    pub board: Board,
    pub next_turn: Mark,
    pub moves: Vec<MoveRecord>,
    pub outcome: Outcome,
    pub created_at: DateTime<Utc>,
    pub last_move_at: DateTime<Utc>,
}

impl Session {
    /// 空の盤面、X手番で新しいセッションを作成する
    pub fn new(id: SessionId, first: ParticipantId, second: Participant) -> Self {
        let now = Utc::now();
        Self {
            id,
            first,
            second,
            board: Board::new(),
            next_turn: Mark::X,
            moves: Vec::new(),
            outcome: Outcome::InProgress,
            created_at: now,
            last_move_at: now,
        }
    }

    /// 参加者に割り当てられた記号を返す
    /// 参加者でなければNone
    pub fn mark_for(&self, identity: &ParticipantId) -> Option<Mark> {
        if &self.first == identity {
            Some(Mark::X)
        } else if self.second.is(identity) {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// 指定記号を担当する参加者
    pub fn participant_for(&self, mark: Mark) -> Participant {
        match mark {
            Mark::X => Participant::Human(self.first.clone()),
            Mark::O => self.second.clone(),
        }
    }

    pub fn is_automated(&self) -> bool {
        matches!(self.second, Participant::Automated)
    }

    /// 次の手番がAIかどうか
    pub fn is_automated_turn(&self) -> bool {
        self.is_automated() && self.next_turn == Mark::O
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.outcome, Outcome::InProgress)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self.outcome {
            Outcome::Won(mark) => Some(mark),
            _ => None,
        }
    }

    /// 受理された手を記録し、手番を交代して終局判定を更新する
    pub fn record_move(&mut self, position: Position, mark: Mark, board: Board) {
        self.board = board;
        self.moves.push(MoveRecord::new(self.participant_for(mark), position, mark));
        self.next_turn = self.next_turn.opposite();
        self.outcome = TicTacToeRules::outcome(&self.board).into();
        self.last_move_at = Utc::now();
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// 参加者の表示名（先手、後手の順）
    pub fn players(&self) -> Vec<String> {
        vec![self.first.to_string(), self.second.display_name().to_string()]
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            board: self.board.to_rows(),
            next_turn: if self.is_finished() { None } else { Some(self.next_turn) },
            winner: self.winner(),
        }
    }
}
