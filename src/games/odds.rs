//! Per-game outcome algorithms
//!
//! Draw order is fixed per game so a scripted [`RandomSource`] maps to exactly
//! one outcome:
//! - coinflip: side, gate
//! - dice: roll, gate
//! - crash: bucket, position inside bucket, gate

use crate::config::{CrashBucket, OddsConfig};
use crate::games::rng::RandomSource;
use crate::games::types::{BetOutcome, CoinChoice, DiceChoice, GameData};

/// Outcome plus what was drawn to reach it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub outcome: BetOutcome,
    pub game_data: GameData,
}

fn outcome_of(win: bool) -> BetOutcome {
    if win {
        BetOutcome::Win
    } else {
        BetOutcome::Lose
    }
}

/// Fair side draw, then the win gate. Both draws always happen.
pub fn resolve_coinflip(odds: &OddsConfig, choice: CoinChoice, rng: &mut dyn RandomSource) -> Resolution {
    let result_choice = if rng.next_f64() < 0.5 {
        CoinChoice::Heads
    } else {
        CoinChoice::Tails
    };
    let gate = rng.next_f64() < odds.coinflip_win_gate;

    Resolution {
        outcome: outcome_of(gate && result_choice == choice),
        game_data: GameData::CoinFlip {
            player_choice: choice,
            result_choice,
        },
    }
}

pub fn roll_die(rng: &mut dyn RandomSource) -> u8 {
    // Out-of-contract draws from a custom source still land on a face
    let u = rng.next_f64().clamp(0.0, 1.0 - f64::EPSILON);
    let face = (u * 6.0).floor() as u8 + 1;
    face.clamp(1, 6)
}

pub fn resolve_dice(odds: &OddsConfig, choice: DiceChoice, rng: &mut dyn RandomSource) -> Resolution {
    let roll = roll_die(rng);
    let classification = DiceChoice::classify(roll);
    let gate = rng.next_f64() < odds.dice_win_gate;

    Resolution {
        outcome: outcome_of(gate && classification == choice),
        game_data: GameData::Dice {
            player_choice: choice,
            roll,
            classification,
        },
    }
}

/// Draw a crash point from the weighted buckets
pub fn draw_crash_point(buckets: &[CrashBucket], rng: &mut dyn RandomSource) -> f64 {
    let total: f64 = buckets.iter().map(|b| b.weight).sum();
    let pick = rng.next_f64() * total;
    let position = rng.next_f64();

    let mut cumulative = 0.0;
    let mut chosen = buckets.last();
    for bucket in buckets {
        cumulative += bucket.weight;
        if bucket.weight > 0.0 && pick < cumulative {
            chosen = Some(bucket);
            break;
        }
    }

    match chosen {
        Some(bucket) => bucket.min + position * (bucket.max - bucket.min),
        None => 1.0,
    }
}

/// Probability that the crash gate lets a correct call through
pub fn crash_gate_probability(odds: &OddsConfig, target: f64) -> f64 {
    if !odds.crash_gate.enabled {
        return 1.0;
    }
    odds.crash_gate.decay.powf((target - 1.0).max(0.0)).clamp(0.0, 1.0)
}

/// `target` must already be validated (finite, >= 1).
pub fn resolve_crash(odds: &OddsConfig, target: f64, rng: &mut dyn RandomSource) -> Resolution {
    let crash_point = draw_crash_point(&odds.crash_buckets, rng);
    let gate = rng.next_f64() < crash_gate_probability(odds, target);

    Resolution {
        outcome: outcome_of(crash_point > target && gate),
        game_data: GameData::Crash { target, crash_point },
    }
}
