//! ゲームの基本型定義モジュール
//! 三目並べで使用されるマーク、セル、座標、参加者IDなどを定義する。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 盤面の一辺のマス数
pub const BOARD_SIZE: usize = 3;

/// プレイヤーが置く記号
/// 先手は常にX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// 相手の記号を返す
    pub fn opposite(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// 記号を対応するセル状態に変換する
    pub fn to_cell(self) -> Cell {
        match self {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// 盤面の各マスの状態を表現するenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    X,
    O,
}

impl Cell {
    /// 置かれている記号を返す（空ならNone）
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }
}

/// 3x3盤面上の座標を表す構造体
/// row, colともに0-2の範囲のみ生成できる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    /// 範囲チェック付きのコンストラクタ
    /// 盤面の範囲外の座標の場合はNoneを返す
    pub fn new(row: usize, col: usize) -> Option<Position> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Position { row, col })
        } else {
            None
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    /// 行優先順で全座標を列挙する
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Position { row, col }))
    }
}

/// 認証済み参加者の識別子
/// 中身は解釈せず、等価比較のみに使用する
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 対局の参加者
/// 人間の場合はそのID、AIの場合は自動プレイヤー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participant {
    Human(ParticipantId),
    Automated,
}

impl Participant {
    /// 指定IDの人間参加者かどうか
    pub fn is(&self, identity: &ParticipantId) -> bool {
        matches!(self, Participant::Human(id) if id == identity)
    }

    /// 表示・履歴用の名前
    pub fn display_name(&self) -> &str {
        match self {
            Participant::Human(id) => id.as_str(),
            Participant::Automated => "AI",
        }
    }
}
