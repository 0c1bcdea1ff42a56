//! AI方策の実装モジュール
//! 自動プレイヤーの着手選択方策（先頭空きマス、ミニマックス法）を定義し、
//! 統一されたインターフェースで提供する。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PolicyError;
use crate::game::{Board, BoardOutcome, Mark, Position, TicTacToeRules};

/// AI方策の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// 行優先で最初の空きマスを選ぶ
    FirstAvailable,
    /// 全探索のミニマックス法
    Minimax,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first_available" | "easy" => Ok(PolicyKind::FirstAvailable),
            "minimax" | "hard" => Ok(PolicyKind::Minimax),
            _ => Err(format!("Invalid policy: {}. Valid options: first_available, minimax", s)),
        }
    }
}

/// 自動プレイヤーの着手選択インターフェース
/// 同じ盤面と記号に対しては常に同じ手を返す
pub trait OpponentPolicy: Send + Sync {
    /// 空きマスの座標を1つ選ぶ
    fn choose_move(&self, board: &Board, mark: Mark) -> Result<Position, PolicyError>;

    fn name(&self) -> &'static str;
}

/// 行優先で最初の空きマスを選ぶ基本方策
#[derive(Debug, Clone, Default)]
pub struct FirstAvailablePolicy;

impl OpponentPolicy for FirstAvailablePolicy {
    fn choose_move(&self, board: &Board, _mark: Mark) -> Result<Position, PolicyError> {
        Position::all()
            .find(|p| board.is_empty(*p))
            .ok_or(PolicyError::NoEmptyCell)
    }

    fn name(&self) -> &'static str {
        "FirstAvailablePolicy"
    }
}

/// ミニマックス法で最善手を選ぶ方策
/// 盤面が小さいため枝刈りなしの全探索で十分高速
#[derive(Debug, Clone, Default)]
pub struct MinimaxPolicy;

impl MinimaxPolicy {
    /// `to_move`視点ではなく`me`視点の評価値を返す
    /// 早い勝ちと遅い負けを優先するため残り空きマス数で重み付けする
    fn score(board: &Board, me: Mark, to_move: Mark) -> i32 {
        match TicTacToeRules::outcome(board) {
            BoardOutcome::Won(mark) => {
                let remaining = board.empty_positions().len() as i32 + 1;
                if mark == me { remaining } else { -remaining }
            }
            BoardOutcome::Draw => 0,
            BoardOutcome::InProgress => {
                let scores = board.empty_positions().into_iter().map(|p| {
                    let applied = TicTacToeRules::apply_move(board, p, to_move, to_move);
                    Self::score(&applied.board, me, to_move.opposite())
                });
                if to_move == me {
                    scores.max().unwrap_or(0)
                } else {
                    scores.min().unwrap_or(0)
                }
            }
        }
    }
}

impl OpponentPolicy for MinimaxPolicy {
    fn choose_move(&self, board: &Board, mark: Mark) -> Result<Position, PolicyError> {
        let mut best: Option<(Position, i32)> = None;

        // 同点の場合は行優先で先に見つかった手を採用する
        for position in board.empty_positions() {
            let applied = TicTacToeRules::apply_move(board, position, mark, mark);
            let score = Self::score(&applied.board, mark, mark.opposite());
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((position, score));
            }
        }

        best.map(|(position, _)| position).ok_or(PolicyError::NoEmptyCell)
    }

    fn name(&self) -> &'static str {
        "MinimaxPolicy"
    }
}

/// 種類に応じたAI方策を生成するファクトリ関数
pub fn create_policy(kind: PolicyKind) -> Box<dyn OpponentPolicy> {
    match kind {
        PolicyKind::FirstAvailable => Box::new(FirstAvailablePolicy),
        PolicyKind::Minimax => Box::new(MinimaxPolicy),
    }
}
