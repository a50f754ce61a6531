//! End-to-end settlement through the public API

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use toncasino::{
    delay::{NoDelay, SettlementDelay},
    errors::FundingError,
    games::{ScriptedRandom, SeededRandom},
    wallet::{ReadOnlyWallet, StakeTransfer, WalletConnector},
    BetError, BetMode, Casino, CasinoConfig, CoinChoice, DiceChoice, GameData, LeaderboardKind,
    PlayerIdentity, PlayerSession, Prediction,
};

fn scripted_session(casino: &Casino, user: &str, draws: Vec<f64>) -> Arc<PlayerSession> {
    let session = casino
        .new_session()
        .with_identity(PlayerIdentity::new(user, format!("@{}", user)))
        .with_random(Box::new(ScriptedRandom::new(draws)))
        .with_delay(Arc::new(NoDelay));
    casino.attach_session(session).expect("identity set")
}

/// Blocks settlement until released
struct GateDelay {
    release: Notify,
}

#[async_trait]
impl SettlementDelay for GateDelay {
    async fn wait(&self, _duration: Duration) {
        self.release.notified().await;
    }
}

struct FailingWallet;

#[async_trait]
impl WalletConnector for FailingWallet {
    fn address(&self) -> &str {
        "EQ-failing"
    }

    async fn balance(&self) -> Result<f64, FundingError> {
        Ok(500.0)
    }

    async fn submit_stake(&self, _transfer: &StakeTransfer) -> Result<String, FundingError> {
        Err(FundingError::SubmissionRejected("user declined".to_string()))
    }
}

/// Accepts every stake and counts submissions
#[derive(Default)]
struct CountingWallet {
    submitted: AtomicUsize,
}

#[async_trait]
impl WalletConnector for CountingWallet {
    fn address(&self) -> &str {
        "EQ-counting"
    }

    async fn balance(&self) -> Result<f64, FundingError> {
        Ok(500.0)
    }

    async fn submit_stake(&self, transfer: &StakeTransfer) -> Result<String, FundingError> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tx:{}", transfer.bet_id))
    }
}

#[tokio::test]
async fn test_win_and_loss_move_balance() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();

    let winner = scripted_session(&casino, "w", vec![0.1, 0.2]);
    let bet = winner
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
        .await
        .unwrap();
    assert!(bet.is_win());
    assert!((winner.balance() - 107.98).abs() < 1e-9);

    let loser = scripted_session(&casino, "l", vec![0.1, 0.9]);
    let bet = loser
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
        .await
        .unwrap();
    assert!(!bet.is_win());
    assert!((loser.balance() - 90.0).abs() < 1e-9);

    let board = casino.leaderboard(LeaderboardKind::Profit, 10);
    assert_eq!(board[0].user_id, "w");
    assert!((board[0].net_profit - 7.98).abs() < 1e-9);
    assert!((board[1].net_profit + 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_dice_classifies_roll() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    // roll 3 is low; gate open
    let session = scripted_session(&casino, "d", vec![0.4, 0.1]);

    let bet = session
        .place_bet(Prediction::dice(DiceChoice::High), BetMode::Real(5.0))
        .await
        .unwrap();
    assert!(!bet.is_win());
    match bet.game_data {
        GameData::Dice { roll, classification, .. } => {
            assert_eq!(roll, 3);
            assert_eq!(classification, DiceChoice::Low);
        }
        other => panic!("Expected dice data, got {:?}", other),
    }
}

#[tokio::test]
async fn test_crash_point_against_target() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    // bucket [1.2, 3.0), midpoint 2.1, gate open
    let session = scripted_session(&casino, "c", vec![0.5, 0.5, 0.5]);

    let win = session
        .place_bet(Prediction::crash(2.0), BetMode::Real(5.0))
        .await
        .unwrap();
    assert!(win.is_win());

    let loss = session
        .place_bet(Prediction::crash(2.5), BetMode::Real(5.0))
        .await
        .unwrap();
    assert!(!loss.is_win());
    match loss.game_data {
        GameData::Crash { target, crash_point } => {
            assert_eq!(target, 2.5);
            assert!((crash_point - 2.1).abs() < 1e-9);
        }
        other => panic!("Expected crash data, got {:?}", other),
    }
}

#[tokio::test]
async fn test_trial_plays_are_isolated_from_money() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let session = scripted_session(&casino, "t", vec![0.1, 0.2]);

    session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Trial)
        .await
        .unwrap();
    session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Trial)
        .await
        .unwrap();
    let err = session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Trial)
        .await
        .unwrap_err();

    assert_eq!(err, BetError::NoTrialsLeft);
    assert_eq!(session.balance(), 100.0);
    assert!(session.stats().is_none());
    assert!(casino.leaderboard(LeaderboardKind::Bets, 10).is_empty());
    assert_eq!(casino.metrics().trial_bets, 2);
    assert_eq!(casino.metrics().rejections, 1);
}

#[tokio::test]
async fn test_stats_stay_consistent_with_history() {
    let mut config = CasinoConfig::testing();
    config.engine.history_limit = 0;
    config.session.starting_balance = 10_000.0;
    let casino = Casino::new(config).unwrap();
    let session = casino.attach_session(
        casino
            .new_session()
            .with_identity(PlayerIdentity::new("s", "@s"))
            .with_random(Box::new(SeededRandom::new(99)))
            .with_delay(Arc::new(NoDelay)),
    )
    .unwrap();

    for round in 0..200 {
        let prediction = match round % 3 {
            0 => Prediction::coinflip(CoinChoice::Tails),
            1 => Prediction::dice(DiceChoice::High),
            _ => Prediction::crash(1.5),
        };
        session.place_bet(prediction, BetMode::Real(2.0)).await.unwrap();
    }

    let stats = session.stats().unwrap();
    let history = session.bets();
    assert_eq!(history.len(), 200);
    assert_eq!(stats.total_bets, stats.total_wins + stats.total_losses);
    assert_eq!(stats.total_wins as usize, history.iter().filter(|b| b.is_win()).count());

    let net: f64 = history.iter().map(|b| b.net()).sum();
    assert!((stats.net_profit - net).abs() < 1e-6);
    assert!((session.balance() - (10_000.0 + net)).abs() < 1e-6);
}

#[tokio::test]
async fn test_failed_wallet_submission_changes_nothing() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let session = scripted_session(&casino, "f", vec![0.1, 0.2]);
    session.connect_wallet(Arc::new(FailingWallet));

    let err = session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
        .await
        .unwrap_err();

    assert!(matches!(err, BetError::TransactionFailed(ref msg) if msg.contains("user declined")));
    assert_eq!(session.balance(), 100.0);
    assert!(session.bets().is_empty());
    assert!(session.stats().is_none());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_wallet_balance_bounds_stake() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let session = scripted_session(&casino, "wb", vec![0.1, 0.2]);
    let wallet = Arc::new(ReadOnlyWallet::new("EQ-reader", 3.0));
    session.connect_wallet(wallet.clone());

    assert_eq!(session.available_balance().await.unwrap(), 3.0);
    assert_eq!(session.max_bet().await.unwrap(), 3.0);

    let err = session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(5.0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BetError::InsufficientBalance {
            required: 5.0,
            available: 3.0
        }
    );

    // A wallet win is recorded but never credited to the simulated balance
    wallet.set_balance(50.0);
    let bet = session
        .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(5.0))
        .await
        .unwrap();
    assert!(bet.is_win());
    assert_eq!(session.balance(), 100.0);
    assert_eq!(session.stats().unwrap().total_wins, 1);

    session.disconnect_wallet();
    assert_eq!(session.available_balance().await.unwrap(), 100.0);
}

#[tokio::test]
async fn test_second_bet_rejected_while_settling() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let delay = Arc::new(GateDelay {
        release: Notify::new(),
    });
    let session = casino
        .attach_session(
            casino
                .new_session()
                .with_identity(PlayerIdentity::new("b", "@b"))
                .with_random(Box::new(ScriptedRandom::new([0.1, 0.9])))
                .with_delay(delay.clone()),
        )
        .unwrap();

    let first = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0))
                .await
        })
    };

    while !session.is_busy() {
        tokio::task::yield_now().await;
    }

    let err = session
        .place_bet(Prediction::coinflip(CoinChoice::Tails), BetMode::Real(10.0))
        .await
        .unwrap_err();
    assert_eq!(err, BetError::SettlementInProgress);
    assert_eq!(session.balance(), 90.0);

    delay.release.notify_one();
    let bet = first.await.unwrap().unwrap();
    assert!(!bet.is_win());
    assert!(!session.is_busy());
    assert_eq!(session.bets().len(), 1);
}

#[tokio::test]
async fn test_bet_amount_controls_follow_balance() {
    let mut config = CasinoConfig::testing();
    config.session.starting_balance = 0.5;
    let casino = Casino::new(config).unwrap();
    let session = casino.open_session(PlayerIdentity::new("p", "@p"));

    // Below the minimum bet nothing is playable
    assert_eq!(session.bet_amount(), 0.0);
    assert_eq!(session.increase_bet(5.0).await.unwrap(), 0.0);

    let err = session
        .place_configured_bet(Prediction::dice(DiceChoice::Low), false)
        .await
        .unwrap_err();
    assert_eq!(err, BetError::InvalidAmount(0.0));
}

#[tokio::test]
async fn test_unauthenticated_session_rejected() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let session = casino.open_session(PlayerIdentity::new("o", "@o"));
    session.sign_out();

    let err = session
        .place_bet(Prediction::crash(2.0), BetMode::Real(5.0))
        .await
        .unwrap_err();
    assert_eq!(err, BetError::NotAuthenticated);

    session.sign_in(PlayerIdentity::new("o", "@o"));
    assert!(session.identity().is_some());
}

#[tokio::test]
async fn test_wallet_bet_settles_after_caller_gives_up() {
    let casino = Casino::new(CasinoConfig::testing()).unwrap();
    let delay = Arc::new(GateDelay {
        release: Notify::new(),
    });
    let wallet = Arc::new(CountingWallet::default());
    let session = casino
        .attach_session(
            casino
                .new_session()
                .with_identity(PlayerIdentity::new("wt", "@wt"))
                .with_random(Box::new(ScriptedRandom::new([0.1, 0.9])))
                .with_delay(delay.clone()),
        )
        .unwrap();
    session.connect_wallet(wallet.clone());

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        session.place_bet(Prediction::coinflip(CoinChoice::Heads), BetMode::Real(10.0)),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(wallet.submitted.load(Ordering::SeqCst), 1);
    assert!(session.is_busy());

    delay.release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.is_busy() || session.bets().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("settlement should finish");

    let bets = session.bets();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].amount, 10.0);
    let stats = session.stats().unwrap();
    assert_eq!(stats.total_bets, 1);
    assert_eq!(stats.total_losses, 1);
    assert_eq!(wallet.submitted.load(Ordering::SeqCst), 1);
    assert_eq!(casino.metrics().bets_settled, 1);
}
