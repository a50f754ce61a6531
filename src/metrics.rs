//! Engine counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub struct EngineMetrics {
    start_time: Instant,
    bets_settled: AtomicU64,
    wins: AtomicU64,
    losses: AtomicU64,
    trial_bets: AtomicU64,
    rejections: AtomicU64,
    /// (wagered, paid out) on real bets
    volume: RwLock<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub bets_settled: u64,
    pub wins: u64,
    pub losses: u64,
    pub trial_bets: u64,
    pub rejections: u64,
    pub total_wagered: f64,
    pub total_paid_out: f64,
    pub uptime_secs: u64,
}

impl MetricsSnapshot {
    /// Share of real wagers kept by the house so far
    pub fn realized_house_edge(&self) -> f64 {
        if self.total_wagered <= 0.0 {
            return 0.0;
        }
        (self.total_wagered - self.total_paid_out) / self.total_wagered
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bets_settled: AtomicU64::new(0),
            wins: AtomicU64::new(0),
            losses: AtomicU64::new(0),
            trial_bets: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            volume: RwLock::new((0.0, 0.0)),
        }
    }

    pub fn record_settlement(&self, won: bool, is_trial: bool, wagered: f64, paid_out: f64) {
        self.bets_settled.fetch_add(1, Ordering::SeqCst);
        if won {
            self.wins.fetch_add(1, Ordering::SeqCst);
        } else {
            self.losses.fetch_add(1, Ordering::SeqCst);
        }
        if is_trial {
            self.trial_bets.fetch_add(1, Ordering::SeqCst);
            return;
        }
        if let Ok(mut volume) = self.volume.write() {
            volume.0 += wagered;
            volume.1 += paid_out;
        }
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total_runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (total_wagered, total_paid_out) = self.volume.read().map(|v| *v).unwrap_or((0.0, 0.0));
        MetricsSnapshot {
            bets_settled: self.bets_settled.load(Ordering::SeqCst),
            wins: self.wins.load(Ordering::SeqCst),
            losses: self.losses.load(Ordering::SeqCst),
            trial_bets: self.trial_bets.load(Ordering::SeqCst),
            rejections: self.rejections.load(Ordering::SeqCst),
            total_wagered,
            total_paid_out,
            uptime_secs: self.total_runtime().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
