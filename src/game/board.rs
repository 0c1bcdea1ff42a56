//! 三目並べの盤面状態を管理するモジュール
//! 3x3グリッドのマス状態と読み書き操作を担当する。

use super::types::{Cell, Mark, Position, BOARD_SIZE};
use serde::{Deserialize, Serialize};

/// 3x3の盤面を表現する構造体
/// 座標はPosition型で検証済みのため範囲外アクセスは起こらない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// 全マス空の盤面を作成する
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// 任意のマス配置から盤面を作成する
    /// 通常の対局を経ない盤面になりうるため、主にテストと解析用
    pub fn from_cells(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Board { cells }
    }

    pub fn get_cell(&self, position: Position) -> Cell {
        self.cells[position.row()][position.col()]
    }

    pub(crate) fn set_cell(&mut self, position: Position, cell: Cell) {
        self.cells[position.row()][position.col()] = cell;
    }

    pub fn is_empty(&self, position: Position) -> bool {
        self.get_cell(position) == Cell::Empty
    }

    /// 全マスが埋まっているか
    pub fn is_full(&self) -> bool {
        Position::all().all(|p| !self.is_empty(p))
    }

    /// 空きマスを行優先順で返す
    pub fn empty_positions(&self) -> Vec<Position> {
        Position::all().filter(|p| self.is_empty(*p)).collect()
    }

    /// 盤面上のXとOの数を数える
    /// 戻り値: (X数, O数)
    pub fn count_marks(&self) -> (u8, u8) {
        let mut x_count = 0;
        let mut o_count = 0;

        for row in &self.cells {
            for &cell in row {
                match cell {
                    Cell::X => x_count += 1,
                    Cell::O => o_count += 1,
                    Cell::Empty => {}
                }
            }
        }

        (x_count, o_count)
    }

    /// APIレスポンス用の行列表現（空はNone）
    pub fn to_rows(&self) -> Vec<Vec<Option<Mark>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.mark()).collect())
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
