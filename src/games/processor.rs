use crate::config::{EngineConfig, OddsConfig};
use crate::errors::BetError;
use crate::games::odds::{self, Resolution};
use crate::games::rng::RandomSource;
use crate::games::types::{BetMode, BetOutcome, Prediction};

/// Resolves predictions and prices the result
#[derive(Debug, Clone)]
pub struct GameProcessor {
    engine: EngineConfig,
    odds: OddsConfig,
}

impl GameProcessor {
    pub fn new(engine: EngineConfig, odds: OddsConfig) -> Self {
        Self { engine, odds }
    }

    /// Reject predictions no game can resolve. Draws nothing.
    pub fn validate_prediction(prediction: &Prediction) -> Result<(), BetError> {
        if let Prediction::Crash { target } = prediction {
            if !target.is_finite() || *target < 1.0 {
                return Err(BetError::InvalidPrediction(format!(
                    "crash target must be at least 1.0x, got {}",
                    target
                )));
            }
        }
        Ok(())
    }

    /// Reject stakes that are not a positive amount at or above the minimum.
    pub fn validate_stake(&self, mode: &BetMode) -> Result<(), BetError> {
        match mode {
            BetMode::Trial => Ok(()),
            BetMode::Real(stake) => {
                if !stake.is_finite() || *stake <= 0.0 || *stake < self.engine.min_bet {
                    Err(BetError::InvalidAmount(*stake))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Resolve a validated prediction
    pub fn resolve(&self, prediction: &Prediction, rng: &mut dyn RandomSource) -> Resolution {
        match *prediction {
            Prediction::CoinFlip { choice } => odds::resolve_coinflip(&self.odds, choice, rng),
            Prediction::Dice { choice } => odds::resolve_dice(&self.odds, choice, rng),
            Prediction::Crash { target } => odds::resolve_crash(&self.odds, target, rng),
        }
    }

    /// Amount credited for an outcome: `stake * multiplier - stake * fee` on a
    /// real win, zero otherwise.
    pub fn payout(&self, mode: &BetMode, outcome: BetOutcome) -> f64 {
        match (mode, outcome) {
            (BetMode::Real(stake), BetOutcome::Win) => {
                let platform_fee = stake * self.engine.platform_fee_rate;
                stake * self.engine.payout_multiplier - platform_fee
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::ScriptedRandom;
    use crate::games::types::{CoinChoice, GameType};

    fn processor() -> GameProcessor {
        GameProcessor::new(EngineConfig::default(), OddsConfig::default())
    }

    #[test]
    fn test_payout_on_win() {
        let payout = processor().payout(&BetMode::Real(10.0), BetOutcome::Win);
        assert!((payout - 17.98).abs() < 1e-9);
    }

    #[test]
    fn test_no_payout_on_loss_or_trial() {
        let p = processor();
        assert_eq!(p.payout(&BetMode::Real(10.0), BetOutcome::Lose), 0.0);
        assert_eq!(p.payout(&BetMode::Trial, BetOutcome::Win), 0.0);
    }

    #[test]
    fn test_stake_validation() {
        let p = processor();
        assert!(p.validate_stake(&BetMode::Trial).is_ok());
        assert!(p.validate_stake(&BetMode::Real(5.0)).is_ok());
        assert_eq!(p.validate_stake(&BetMode::Real(0.0)), Err(BetError::InvalidAmount(0.0)));
        assert_eq!(p.validate_stake(&BetMode::Real(-2.0)), Err(BetError::InvalidAmount(-2.0)));
        assert!(p.validate_stake(&BetMode::Real(0.5)).is_err());
        assert!(p.validate_stake(&BetMode::Real(f64::NAN)).is_err());
    }

    #[test]
    fn test_crash_target_validation() {
        assert!(GameProcessor::validate_prediction(&Prediction::crash(1.0)).is_ok());
        assert!(GameProcessor::validate_prediction(&Prediction::crash(0.99)).is_err());
        assert!(GameProcessor::validate_prediction(&Prediction::crash(0.0)).is_err());
        assert!(GameProcessor::validate_prediction(&Prediction::crash(f64::INFINITY)).is_err());
        assert!(GameProcessor::validate_prediction(&Prediction::coinflip(CoinChoice::Tails)).is_ok());
    }

    #[test]
    fn test_resolution_matches_prediction_game() {
        let p = processor();
        let mut rng = ScriptedRandom::new([0.3, 0.3, 0.3]);
        for prediction in [
            Prediction::coinflip(CoinChoice::Heads),
            Prediction::dice(crate::games::types::DiceChoice::Low),
            Prediction::crash(1.5),
        ] {
            let resolution = p.resolve(&prediction, &mut rng);
            assert_eq!(resolution.game_data.game_type(), prediction.game_type());
        }
        assert_eq!(Prediction::crash(1.5).game_type(), GameType::Crash);
    }
}
