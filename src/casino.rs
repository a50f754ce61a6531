//! Casino service
//!
//! Owns the shared statistics registry and metrics and hands out one
//! [`PlayerSession`] per user id.

use crate::config::CasinoConfig;
use crate::errors::{CasinoError, CasinoResult, ConfigurationError};
use crate::games::types::PlayerIdentity;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::session::PlayerSession;
use crate::stats::{LeaderboardKind, StatsRegistry, UserStats};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

pub struct Casino {
    config: CasinoConfig,
    sessions: DashMap<String, Arc<PlayerSession>>,
    stats: Arc<StatsRegistry>,
    metrics: Arc<EngineMetrics>,
}

impl Casino {
    /// Create a casino from a validated configuration
    pub fn new(config: CasinoConfig) -> CasinoResult<Self> {
        config.validate().map_err(|e| {
            CasinoError::Configuration(ConfigurationError::ValidationFailed(e.to_string()))
        })?;

        info!(
            payout_multiplier = config.engine.payout_multiplier,
            platform_fee_rate = config.engine.platform_fee_rate,
            settlement_latency_ms = config.engine.settlement_latency_ms,
            "Casino initialized"
        );

        Ok(Self {
            config,
            sessions: DashMap::new(),
            stats: Arc::new(StatsRegistry::new()),
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    /// Existing session for the user, or a fresh signed-in one
    pub fn open_session(&self, identity: PlayerIdentity) -> Arc<PlayerSession> {
        self.sessions
            .entry(identity.user_id.clone())
            .or_insert_with(|| {
                info!(user_id = %identity.user_id, "Opening session");
                Arc::new(
                    PlayerSession::new(&self.config, self.stats.clone(), self.metrics.clone())
                        .with_identity(identity.clone()),
                )
            })
            .value()
            .clone()
    }

    /// Register a session built by the caller, e.g. with a custom random source
    pub fn attach_session(&self, session: PlayerSession) -> Option<Arc<PlayerSession>> {
        let user_id = session.identity()?.user_id;
        let session = Arc::new(session);
        self.sessions.insert(user_id, session.clone());
        Some(session)
    }

    /// Session builder wired to this casino's registry and metrics
    pub fn new_session(&self) -> PlayerSession {
        PlayerSession::new(&self.config, self.stats.clone(), self.metrics.clone())
    }

    pub fn session(&self, user_id: &str) -> Option<Arc<PlayerSession>> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    /// Drop the session; statistics outlive it
    pub fn close_session(&self, user_id: &str) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> Arc<StatsRegistry> {
        self.stats.clone()
    }

    pub fn leaderboard(&self, kind: LeaderboardKind, limit: usize) -> Vec<UserStats> {
        self.stats.leaderboard(kind, limit)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::NoDelay;
    use crate::games::rng::ScriptedRandom;
    use crate::games::types::{BetMode, CoinChoice, Prediction};

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = CasinoConfig::testing();
        config.engine.payout_multiplier = 0.0;
        assert!(Casino::new(config).is_err());
    }

    #[test]
    fn test_sessions_are_per_user() {
        let casino = Casino::new(CasinoConfig::testing()).unwrap();
        let a = casino.open_session(PlayerIdentity::new("u1", "alice"));
        let again = casino.open_session(PlayerIdentity::new("u1", "alice"));
        let b = casino.open_session(PlayerIdentity::new("u2", "bob"));

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(casino.session_count(), 2);

        assert!(casino.close_session("u1"));
        assert!(casino.session("u1").is_none());
        assert!(!casino.close_session("u1"));
    }

    #[tokio::test]
    async fn test_leaderboard_spans_sessions() {
        let casino = Casino::new(CasinoConfig::testing()).unwrap();
        for (id, name, gate) in [("u1", "alice", 0.1), ("u2", "bob", 0.9)] {
            let session = casino
                .new_session()
                .with_identity(PlayerIdentity::new(id, name))
                .with_random(Box::new(ScriptedRandom::new([0.1, gate])))
                .with_delay(Arc::new(NoDelay));
            let session = casino.attach_session(session).unwrap();
            session
                .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
                .await
                .unwrap();
        }

        let board = casino.leaderboard(LeaderboardKind::Profit, 10);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].username, "alice");
        assert_eq!(casino.metrics().bets_settled, 2);
        assert_eq!(casino.metrics().wins, 1);
    }
}
