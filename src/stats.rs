//! Per-player aggregate statistics, leaderboards and achievements

use crate::games::types::{Bet, PlayerIdentity};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
const HIGH_ROLLER_STAKE: f64 = 10.0;
const DICE_MASTER_BETS: u64 = 5;
const LUCKY_STREAK_WINS: u64 = 3;

/// Aggregate results for one player. Trial bets never count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub user_id: String,
    pub username: String,
    pub total_bets: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub net_profit: f64,
}

impl UserStats {
    pub fn new(identity: &PlayerIdentity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            total_bets: 0,
            total_wins: 0,
            total_losses: 0,
            net_profit: 0.0,
        }
    }

    fn apply(&mut self, bet: &Bet) {
        self.total_bets += 1;
        if bet.is_win() {
            self.total_wins += 1;
        } else {
            self.total_losses += 1;
        }
        self.net_profit += bet.payout - bet.amount;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    Wins,
    Bets,
    Profit,
}

impl std::str::FromStr for LeaderboardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wins" => Ok(LeaderboardKind::Wins),
            "bets" => Ok(LeaderboardKind::Bets),
            "profit" => Ok(LeaderboardKind::Profit),
            other => Err(format!("unknown leaderboard '{}'", other)),
        }
    }
}

/// Thread-safe registry of stats keyed by user id.
///
/// Each update holds the shard lock for its key, so one player's counters
/// always move together.
#[derive(Default)]
pub struct StatsRegistry {
    stats: DashMap<String, UserStats>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            stats: DashMap::new(),
        }
    }

    /// Fold a settled real bet into its player's stats. Trials are ignored.
    pub fn record(&self, bet: &Bet) -> Option<UserStats> {
        if bet.is_trial {
            return None;
        }

        let mut entry = self
            .stats
            .entry(bet.user_id.clone())
            .or_insert_with(|| UserStats::new(&PlayerIdentity::new(&bet.user_id, &bet.username)));
        entry.username = bet.username.clone();
        entry.apply(bet);
        Some(entry.value().clone())
    }

    pub fn get(&self, user_id: &str) -> Option<UserStats> {
        self.stats.get(user_id).map(|s| s.value().clone())
    }

    pub fn player_count(&self) -> usize {
        self.stats.len()
    }

    /// Top `limit` players, best first. Ties keep username order.
    pub fn leaderboard(&self, kind: LeaderboardKind, limit: usize) -> Vec<UserStats> {
        let mut all: Vec<UserStats> = self.stats.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            let primary = match kind {
                LeaderboardKind::Wins => b.total_wins.cmp(&a.total_wins),
                LeaderboardKind::Bets => b.total_bets.cmp(&a.total_bets),
                LeaderboardKind::Profit => b
                    .net_profit
                    .partial_cmp(&a.net_profit)
                    .unwrap_or(Ordering::Equal),
            };
            primary.then_with(|| a.username.cmp(&b.username))
        });
        all.truncate(limit);
        all
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
    pub progress: Option<Progress>,
}

/// Longest run of consecutive real wins in a history
fn longest_win_streak(history: &[Bet]) -> u64 {
    let mut best = 0;
    let mut run = 0;
    for bet in history.iter().filter(|b| !b.is_trial) {
        if bet.is_win() {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// Profile achievements for a player
pub fn achievements(stats: Option<&UserStats>, history: &[Bet]) -> Vec<Achievement> {
    let total_bets = stats.map(|s| s.total_bets).unwrap_or(0);
    let streak = longest_win_streak(history);
    let high_roller = history
        .iter()
        .any(|b| !b.is_trial && b.amount >= HIGH_ROLLER_STAKE);

    vec![
        Achievement {
            id: "first-steps",
            title: "First Steps",
            description: "Place your first bet",
            unlocked: total_bets > 0,
            progress: None,
        },
        Achievement {
            id: "dice-master",
            title: "Dice Master",
            description: "Roll the dice 5 times",
            unlocked: total_bets >= DICE_MASTER_BETS,
            progress: Some(Progress {
                current: total_bets.min(DICE_MASTER_BETS),
                total: DICE_MASTER_BETS,
            }),
        },
        Achievement {
            id: "winning-streak",
            title: "Lucky Streak",
            description: "Win 3 games in a row",
            unlocked: streak >= LUCKY_STREAK_WINS,
            progress: Some(Progress {
                current: streak.min(LUCKY_STREAK_WINS),
                total: LUCKY_STREAK_WINS,
            }),
        },
        Achievement {
            id: "high-roller",
            title: "High Roller",
            description: "Place a bet of 10 TON or more",
            unlocked: high_roller,
            progress: None,
        },
    ]
}
