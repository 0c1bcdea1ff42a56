//! 三目並べのルール実装モジュール
//! 着手の検証と適用、勝敗・引き分け判定を担当する。
//! 入出力や並行制御は一切持たない純粋関数のみで構成される。

use super::board::Board;
use super::types::{Mark, Position, BOARD_SIZE};

/// 勝利判定で調べるライン
/// 走査順: 行（上から）、列（左から）、主対角線、副対角線
const LINES: [[(usize, usize); BOARD_SIZE]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// 着手適用の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveApplication {
    pub board: Board,
    pub accepted: bool,
}

/// 盤面から導かれる対局の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOutcome {
    InProgress,
    Won(Mark),
    Draw,
}

/// 三目並べのルールを実装する構造体
/// スタティックメソッドのみを提供する
pub struct TicTacToeRules;

impl TicTacToeRules {
    /// 指定マスに記号を置く
    /// マスが空で、かつ記号が手番と一致する場合のみ受理する。
    /// 手番の交代は呼び出し側の責務。却下はエラーではなく通常の結果。
    pub fn apply_move(
        board: &Board,
        position: Position,
        mark: Mark,
        expected_turn: Mark,
    ) -> MoveApplication {
        if mark != expected_turn || !board.is_empty(position) {
            return MoveApplication {
                board: *board,
                accepted: false,
            };
        }

        let mut next = *board;
        next.set_cell(position, mark.to_cell());
        MoveApplication {
            board: next,
            accepted: true,
        }
    }

    /// 同じ記号が3つ並んだ最初のラインの記号を返す
    pub fn detect_winner(board: &Board) -> Option<Mark> {
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.map(|(row, col)| {
                // LINESの座標は全て範囲内
                Position::new(row, col).and_then(|p| board.get_cell(p).mark())
            });
            match (a, b, c) {
                (Some(first), Some(second), Some(third)) if first == second && second == third => {
                    Some(first)
                }
                _ => None,
            }
        })
    }

    /// 全マスが埋まり、かつ勝者がいない場合に引き分け
    pub fn is_draw(board: &Board) -> bool {
        board.is_full() && Self::detect_winner(board).is_none()
    }

    /// 勝者・引き分け・継続のいずれかを判定する
    pub fn outcome(board: &Board) -> BoardOutcome {
        if let Some(mark) = Self::detect_winner(board) {
            BoardOutcome::Won(mark)
        } else if Self::is_draw(board) {
            BoardOutcome::Draw
        } else {
            BoardOutcome::InProgress
        }
    }
}
