//! ランキング統計の読み取りインターフェース
//! 統計の集計・更新は外部ストアの責務で、ここでは読み取りのみ扱う。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// ランキングの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_played: u32,
}

impl LeaderboardEntry {
    pub fn new(username: impl Into<String>, wins: u32, losses: u32, draws: u32) -> Self {
        Self {
            username: username.into(),
            wins,
            losses,
            draws,
            games_played: wins + losses + draws,
        }
    }
}

/// 上位プレイヤーを返す統計ストア
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn top_players(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StatsError>;
}

/// 固定データを返す統計ストア
/// 勝利数の降順、同数なら試合数の少ない順に並べる
#[derive(Debug, Clone)]
pub struct StaticStatsProvider {
    entries: Vec<LeaderboardEntry>,
}

impl StaticStatsProvider {
    pub fn new(mut entries: Vec<LeaderboardEntry>) -> Self {
        entries.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.games_played.cmp(&b.games_played)));
        Self { entries }
    }

    /// デモ用のサンプルランキング
    pub fn sample() -> Self {
        Self::new(vec![
            LeaderboardEntry::new("alice", 10, 2, 5),
            LeaderboardEntry::new("bob", 7, 4, 3),
            LeaderboardEntry::new("carol", 4, 9, 2),
        ])
    }
}

impl Default for StaticStatsProvider {
    fn default() -> Self {
        Self::sample()
    }
}

#[async_trait]
impl StatsProvider for StaticStatsProvider {
    async fn top_players(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StatsError> {
        Ok(self.entries.iter().take(limit).cloned().collect())
    }
}
