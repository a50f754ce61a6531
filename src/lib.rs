//! TonCasino - bet settlement engine
//!
//! Coinflip, dice and crash wagers settled against a per-player session.
//! A session checks the bet, escrows the stake or a trial play, waits out
//! the settlement latency, and resolves the outcome from an injectable random
//! source. It then credits the payout, records history and updates the shared
//! statistics.
//!
//! ```no_run
//! use std::sync::Arc;
//! use toncasino::{Casino, CasinoConfig, PlayerIdentity, Prediction, CoinChoice, BetMode};
//!
//! # async fn run() -> toncasino::CasinoResult<()> {
//! let casino = Casino::new(CasinoConfig::default())?;
//! let session = casino.open_session(PlayerIdentity::new("u1", "alice"));
//! let bet = session
//!     .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
//!     .await?;
//! println!("won: {}, balance: {}", bet.is_win(), session.balance());
//! # Ok(())
//! # }
//! ```

pub mod casino;
pub mod config;
pub mod delay;
pub mod errors;
pub mod games;
pub mod metrics;
pub mod session;
pub mod simulation;
pub mod stats;
pub mod wallet;

pub use casino::Casino;
pub use config::{CasinoConfig, ConfigLoader};
pub use errors::{BetError, CasinoError, CasinoResult};
pub use games::{
    Bet, BetMode, BetOutcome, CoinChoice, DiceChoice, GameData, GameType, PlayerIdentity, Prediction,
};
pub use session::{PlayerSession, SessionSnapshot};
pub use stats::{LeaderboardKind, UserStats};
