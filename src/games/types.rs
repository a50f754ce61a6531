use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    CoinFlip,
    Dice,
    Crash,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::CoinFlip => write!(f, "coinflip"),
            GameType::Dice => write!(f, "dice"),
            GameType::Crash => write!(f, "crash"),
        }
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coinflip" | "coin" => Ok(GameType::CoinFlip),
            "dice" => Ok(GameType::Dice),
            "crash" => Ok(GameType::Crash),
            other => Err(format!("unknown game '{}'", other)),
        }
    }
}

/// Coin flip choice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinChoice {
    Heads,
    Tails,
}

impl fmt::Display for CoinChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinChoice::Heads => write!(f, "heads"),
            CoinChoice::Tails => write!(f, "tails"),
        }
    }
}

impl FromStr for CoinChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heads" => Ok(CoinChoice::Heads),
            "tails" => Ok(CoinChoice::Tails),
            other => Err(format!("expected heads or tails, got '{}'", other)),
        }
    }
}

/// Dice side of the board: low is 1-3, high is 4-6
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceChoice {
    Low,
    High,
}

impl DiceChoice {
    /// Classify a die face
    pub fn classify(roll: u8) -> Self {
        if roll >= 4 {
            DiceChoice::High
        } else {
            DiceChoice::Low
        }
    }
}

impl fmt::Display for DiceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceChoice::Low => write!(f, "low"),
            DiceChoice::High => write!(f, "high"),
        }
    }
}

impl FromStr for DiceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(DiceChoice::Low),
            "high" => Ok(DiceChoice::High),
            other => Err(format!("expected low or high, got '{}'", other)),
        }
    }
}

/// A player's prediction, tagged with the game it belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Prediction {
    CoinFlip { choice: CoinChoice },
    Dice { choice: DiceChoice },
    /// Cash-out multiplier, must be >= 1
    Crash { target: f64 },
}

impl Prediction {
    pub fn coinflip(choice: CoinChoice) -> Self {
        Prediction::CoinFlip { choice }
    }

    pub fn dice(choice: DiceChoice) -> Self {
        Prediction::Dice { choice }
    }

    pub fn crash(target: f64) -> Self {
        Prediction::Crash { target }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            Prediction::CoinFlip { .. } => GameType::CoinFlip,
            Prediction::Dice { .. } => GameType::Dice,
            Prediction::Crash { .. } => GameType::Crash,
        }
    }

    /// Parse the prediction part of `<game> <prediction>` input
    pub fn parse(game: GameType, raw: &str) -> Result<Self, String> {
        match game {
            GameType::CoinFlip => raw.parse().map(Prediction::coinflip),
            GameType::Dice => raw.parse().map(Prediction::dice),
            GameType::Crash => raw
                .trim_end_matches(|c: char| c == 'x' || c == 'X')
                .parse::<f64>()
                .map(Prediction::crash)
                .map_err(|e| format!("invalid crash target '{}': {}", raw, e)),
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::CoinFlip { choice } => write!(f, "{}", choice),
            Prediction::Dice { choice } => write!(f, "{}", choice),
            Prediction::Crash { target } => write!(f, "{:.2}x", target),
        }
    }
}

/// How a bet is funded. A trial carries no stake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "stake", rename_all = "lowercase")]
pub enum BetMode {
    Trial,
    Real(f64),
}

impl BetMode {
    pub fn stake(&self) -> f64 {
        match self {
            BetMode::Trial => 0.0,
            BetMode::Real(stake) => *stake,
        }
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, BetMode::Trial)
    }
}

/// Bet outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Lose,
}

/// What the game actually drew
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameData {
    CoinFlip {
        player_choice: CoinChoice,
        result_choice: CoinChoice,
    },
    Dice {
        player_choice: DiceChoice,
        roll: u8,
        classification: DiceChoice,
    },
    Crash {
        target: f64,
        crash_point: f64,
    },
}

impl GameData {
    pub fn game_type(&self) -> GameType {
        match self {
            GameData::CoinFlip { .. } => GameType::CoinFlip,
            GameData::Dice { .. } => GameType::Dice,
            GameData::Crash { .. } => GameType::Crash,
        }
    }
}

/// Stable player identity supplied by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlayerIdentity {
    pub user_id: String,
    pub username: String,
}

impl PlayerIdentity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// A settled wager. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub id: String,
    pub game: GameType,
    pub amount: f64,
    pub prediction: Prediction,
    pub outcome: BetOutcome,
    pub payout: f64,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    pub is_trial: bool,
    pub game_data: GameData,
}

impl Bet {
    pub fn is_win(&self) -> bool {
        self.outcome == BetOutcome::Win
    }

    /// Effect of this bet on the player's net profit
    pub fn net(&self) -> f64 {
        if self.is_trial {
            0.0
        } else {
            self.payout - self.amount
        }
    }
}
