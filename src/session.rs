//! Player session and bet settlement
//!
//! A [`PlayerSession`] owns everything that used to be process-wide: balance,
//! configured stake, trial allowance and bet history. [`PlayerSession::place_bet`]
//! is the only path that mutates the money.
//!
//! Settlement is single-flight: an atomic busy flag is taken before anything
//! else and a second call while it is held is rejected. The state mutex is
//! never held across an await.
//!
//! Each settlement runs on its own tokio task. Dropping or timing out the
//! caller does not stop it: once entered, a bet always settles and is recorded.

use crate::config::CasinoConfig;
use crate::delay::{SettlementDelay, TokioDelay};
use crate::errors::{BetError, FundingError};
use crate::games::processor::GameProcessor;
use crate::games::rng::{RandomSource, ThreadRandom};
use crate::games::types::{Bet, BetMode, PlayerIdentity, Prediction};
use crate::metrics::EngineMetrics;
use crate::stats::{self, Achievement, StatsRegistry, UserStats};
use crate::wallet::{FundingSource, StakeTransfer, WalletConnector};
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct SessionState {
    identity: Option<PlayerIdentity>,
    funding: FundingSource,
    balance: f64,
    bet_amount: f64,
    trial_plays_left: u32,
    /// Newest first
    bets: VecDeque<Bet>,
}

/// Presentation view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub balance: f64,
    pub bet_amount: f64,
    pub trial_plays_left: u32,
    pub is_busy: bool,
    pub wallet_address: Option<String>,
    pub bets: Vec<Bet>,
}

pub struct PlayerSession {
    processor: GameProcessor,
    latency: Duration,
    min_bet: f64,
    history_limit: usize,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    rng: Mutex<Box<dyn RandomSource>>,
    delay: Arc<dyn SettlementDelay>,
    stats: Arc<StatsRegistry>,
    metrics: Arc<EngineMetrics>,
}

/// What was taken from the session before settlement
enum Escrow {
    Nothing,
    TrialPlay,
    Balance(f64),
}

/// Holds the busy flag for one settlement.
///
/// The settlement task only drops it unsettled when it panics or the runtime
/// shuts down mid-settlement; the escrowed stake or trial play is then handed back.
struct SettlementGuard<'a> {
    session: &'a PlayerSession,
    escrow: Escrow,
    settled: bool,
}

impl<'a> SettlementGuard<'a> {
    fn acquire(session: &'a PlayerSession) -> Result<Self, BetError> {
        session
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BetError::SettlementInProgress)?;
        Ok(Self {
            session,
            escrow: Escrow::Nothing,
            settled: false,
        })
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for SettlementGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let mut state = self.session.state();
            match self.escrow {
                Escrow::Nothing => {}
                Escrow::TrialPlay => state.trial_plays_left += 1,
                Escrow::Balance(amount) => {
                    state.balance += amount;
                    warn!(amount, "Settlement aborted, stake refunded");
                }
            }
        }
        self.session.busy.store(false, Ordering::Release);
    }
}

/// Clamp a stake to `[min_bet, available]`; zero when even the minimum is unaffordable
fn clamp_stake(amount: f64, min_bet: f64, available: f64) -> f64 {
    if available < min_bet || available <= 0.0 {
        return 0.0;
    }
    if amount.is_nan() {
        return min_bet;
    }
    amount.clamp(min_bet, available)
}

impl PlayerSession {
    /// New unauthenticated session funded by a simulated balance
    pub fn new(config: &CasinoConfig, stats: Arc<StatsRegistry>, metrics: Arc<EngineMetrics>) -> Self {
        let starting_balance = config.session.starting_balance;
        let state = SessionState {
            identity: None,
            funding: FundingSource::Simulated,
            balance: starting_balance,
            bet_amount: clamp_stake(config.session.default_bet_amount, config.engine.min_bet, starting_balance),
            trial_plays_left: config.engine.trial_allowance,
            bets: VecDeque::new(),
        };

        Self {
            processor: GameProcessor::new(config.engine.clone(), config.odds.clone()),
            latency: config.settlement_latency(),
            min_bet: config.engine.min_bet,
            history_limit: config.engine.history_limit,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
            rng: Mutex::new(Box::new(ThreadRandom::new())),
            delay: Arc::new(TokioDelay),
            stats,
            metrics,
        }
    }

    /// Session with its own statistics registry and metrics
    pub fn standalone(config: &CasinoConfig) -> Self {
        Self::new(config, Arc::new(StatsRegistry::new()), Arc::new(EngineMetrics::new()))
    }

    pub fn with_identity(mut self, identity: PlayerIdentity) -> Self {
        self.state_mut().identity = Some(identity);
        self
    }

    pub fn with_random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn SettlementDelay>) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the simulated balance, re-clamping the configured stake
    pub fn with_balance(mut self, balance: f64) -> Self {
        let min_bet = self.min_bet;
        let state = self.state_mut();
        state.balance = balance.max(0.0);
        state.bet_amount = clamp_stake(state.bet_amount, min_bet, state.balance);
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_mut(&mut self) -> &mut SessionState {
        self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rng(&self) -> MutexGuard<'_, Box<dyn RandomSource>> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sign_in(&self, identity: PlayerIdentity) {
        info!(user_id = %identity.user_id, "Player signed in");
        self.state().identity = Some(identity);
    }

    pub fn sign_out(&self) {
        self.state().identity = None;
    }

    pub fn identity(&self) -> Option<PlayerIdentity> {
        self.state().identity.clone()
    }

    /// Make a wallet the authoritative funding source
    pub fn connect_wallet(&self, wallet: Arc<dyn WalletConnector>) {
        info!(address = %wallet.address(), "Wallet connected");
        self.state().funding = FundingSource::Wallet(wallet);
    }

    /// Fall back to the simulated balance
    pub fn disconnect_wallet(&self) {
        self.state().funding = FundingSource::Simulated;
    }

    pub fn funding_source(&self) -> FundingSource {
        self.state().funding.clone()
    }

    /// Simulated balance, whatever the active funding source
    pub fn balance(&self) -> f64 {
        self.state().balance
    }

    /// Balance of the active funding source
    pub async fn available_balance(&self) -> Result<f64, FundingError> {
        let funding = self.funding_source();
        match funding {
            FundingSource::Simulated => Ok(self.balance()),
            FundingSource::Wallet(wallet) => wallet.balance().await,
        }
    }

    pub fn bet_amount(&self) -> f64 {
        self.state().bet_amount
    }

    /// Configure the stake, clamped to `[min_bet, available balance]`
    pub async fn set_bet_amount(&self, amount: f64) -> Result<f64, FundingError> {
        let available = self.available_balance().await?;
        let mut state = self.state();
        state.bet_amount = clamp_stake(amount, self.min_bet, available);
        Ok(state.bet_amount)
    }

    pub async fn increase_bet(&self, step: f64) -> Result<f64, FundingError> {
        let current = self.bet_amount();
        self.set_bet_amount(current + step).await
    }

    pub async fn decrease_bet(&self, step: f64) -> Result<f64, FundingError> {
        let current = self.bet_amount();
        self.set_bet_amount(current - step).await
    }

    pub async fn max_bet(&self) -> Result<f64, FundingError> {
        self.set_bet_amount(f64::INFINITY).await
    }

    pub fn trial_plays_left(&self) -> u32 {
        self.state().trial_plays_left
    }

    /// True while a settlement is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Bet history, newest first
    pub fn bets(&self) -> Vec<Bet> {
        self.state().bets.iter().cloned().collect()
    }

    pub fn stats(&self) -> Option<UserStats> {
        let user_id = self.state().identity.as_ref().map(|i| i.user_id.clone())?;
        self.stats.get(&user_id)
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        stats::achievements(self.stats().as_ref(), &self.bets())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let is_busy = self.is_busy();
        let state = self.state();
        SessionSnapshot {
            user_id: state.identity.as_ref().map(|i| i.user_id.clone()),
            username: state.identity.as_ref().map(|i| i.username.clone()),
            balance: state.balance,
            bet_amount: state.bet_amount,
            trial_plays_left: state.trial_plays_left,
            is_busy,
            wallet_address: match &state.funding {
                FundingSource::Simulated => None,
                FundingSource::Wallet(wallet) => Some(wallet.address().to_string()),
            },
            bets: state.bets.iter().cloned().collect(),
        }
    }

    /// Place a bet with the configured stake, or a trial play
    pub async fn place_configured_bet(
        self: &Arc<Self>,
        prediction: Prediction,
        is_trial: bool,
    ) -> Result<Bet, BetError> {
        let mode = if is_trial {
            BetMode::Trial
        } else {
            BetMode::Real(self.bet_amount())
        };
        self.place_bet(prediction, mode).await
    }

    /// Validate, escrow, wait, resolve and settle one wager.
    ///
    /// Returns the recorded bet; `bet.is_win()` is the win/loss result. On
    /// `Err` nothing about the session has changed.
    ///
    /// The work runs on a spawned task, so it must be called inside a tokio
    /// runtime. Dropping the returned future only stops waiting for the result.
    pub async fn place_bet(self: &Arc<Self>, prediction: Prediction, mode: BetMode) -> Result<Bet, BetError> {
        let session = Arc::clone(self);
        let settlement = tokio::spawn(async move {
            let result = session.settle(prediction, mode).await;
            if let Err(ref reason) = result {
                session.metrics.record_rejection();
                warn!(
                    game = %prediction.game_type(),
                    stake = mode.stake(),
                    %reason,
                    "Bet rejected"
                );
            }
            result
        });

        settlement
            .await
            .map_err(|e| BetError::SettlementAborted(e.to_string()))?
    }

    async fn settle(&self, prediction: Prediction, mode: BetMode) -> Result<Bet, BetError> {
        let mut guard = SettlementGuard::acquire(self)?;

        let (identity, funding) = {
            let state = self.state();
            let identity = state.identity.clone().ok_or(BetError::NotAuthenticated)?;
            if mode.is_trial() && state.trial_plays_left == 0 {
                return Err(BetError::NoTrialsLeft);
            }
            (identity, state.funding.clone())
        };
        self.processor.validate_stake(&mode)?;
        GameProcessor::validate_prediction(&prediction)?;

        let bet_id = Uuid::new_v4().to_string();
        let stake = mode.stake();

        match (&mode, &funding) {
            (BetMode::Trial, _) => {
                let mut state = self.state();
                state.trial_plays_left -= 1;
                guard.escrow = Escrow::TrialPlay;
            }
            (BetMode::Real(_), FundingSource::Simulated) => {
                let mut state = self.state();
                if stake > state.balance {
                    return Err(BetError::InsufficientBalance {
                        required: stake,
                        available: state.balance,
                    });
                }
                state.balance -= stake;
                guard.escrow = Escrow::Balance(stake);
                debug!(bet_id = %bet_id, stake, balance = state.balance, "Stake escrowed");
            }
            (BetMode::Real(_), FundingSource::Wallet(wallet)) => {
                let available = wallet.balance().await?;
                if stake > available {
                    return Err(BetError::InsufficientBalance {
                        required: stake,
                        available,
                    });
                }
                let transfer = StakeTransfer {
                    bet_id: bet_id.clone(),
                    from_address: wallet.address().to_string(),
                    amount: stake,
                };
                let reference = wallet.submit_stake(&transfer).await?;
                debug!(bet_id = %bet_id, %reference, "Stake submitted to wallet");
            }
        }

        self.delay.wait(self.latency).await;

        let resolution = {
            let mut rng = self.rng();
            self.processor.resolve(&prediction, &mut **rng)
        };
        debug!(outcome = ?resolution.outcome, game_data = ?resolution.game_data, "Outcome resolved");
        let payout = self.processor.payout(&mode, resolution.outcome);

        let bet = Bet {
            id: bet_id,
            game: prediction.game_type(),
            amount: stake,
            prediction,
            outcome: resolution.outcome,
            payout,
            timestamp: Utc::now(),
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            is_trial: mode.is_trial(),
            game_data: resolution.game_data,
        };

        // No await past this point: the bet is settled
        guard.settle();
        {
            let mut state = self.state();
            state.bets.push_front(bet.clone());
            if self.history_limit > 0 {
                state.bets.truncate(self.history_limit);
            }
        }
        let stats = self.stats.record(&bet);
        if bet.is_win() && funding.is_simulated() {
            self.state().balance += payout;
        }
        self.metrics
            .record_settlement(bet.is_win(), bet.is_trial, bet.amount, bet.payout);

        info!(
            bet_id = %bet.id,
            user_id = %bet.user_id,
            game = %bet.game,
            prediction = %bet.prediction,
            stake = bet.amount,
            payout = bet.payout,
            win = bet.is_win(),
            trial = bet.is_trial,
            total_bets = stats.as_ref().map(|s| s.total_bets).unwrap_or(0),
            "Bet settled"
        );

        Ok(bet)
    }
}
