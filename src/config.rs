//! Configuration management with validation and defaults
//!
//! Every number that shapes the odds or the money flow lives here, so a house
//! edge model is a configuration choice rather than a code change.

use crate::errors::{CasinoResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CasinoConfig {
    pub engine: EngineConfig,
    pub odds: OddsConfig,
    pub session: SessionConfig,
    pub monitoring: MonitoringConfig,
}

/// Payout, fee and settlement pacing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Gross multiplier applied to the stake on a win
    pub payout_multiplier: f64,
    /// Fraction of the stake kept as platform fee on a win
    pub platform_fee_rate: f64,
    /// Free plays granted to every new session
    pub trial_allowance: u32,
    pub min_bet: f64,
    /// Simulated confirmation delay between escrow and settlement
    pub settlement_latency_ms: u64,
    /// Maximum bets kept in a session history; 0 keeps everything
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payout_multiplier: 1.8,
            platform_fee_rate: 0.002,
            trial_allowance: 2,
            min_bet: 1.0,
            settlement_latency_ms: 1500,
            history_limit: 100,
        }
    }
}

/// Win-probability gates and the crash point distribution
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OddsConfig {
    pub coinflip_win_gate: f64,
    pub dice_win_gate: f64,
    pub crash_buckets: Vec<CrashBucket>,
    pub crash_gate: CrashGateConfig,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            coinflip_win_gate: 0.49,
            dice_win_gate: 0.49,
            crash_buckets: vec![
                CrashBucket::new(1.0, 1.2, 0.15),
                CrashBucket::new(1.2, 3.0, 0.50),
                CrashBucket::new(3.0, 8.0, 0.25),
                CrashBucket::new(8.0, 20.0, 0.08),
                CrashBucket::new(20.0, 50.0, 0.02),
            ],
            crash_gate: CrashGateConfig::default(),
        }
    }
}

/// Half-open multiplier range `[min, max)` drawn with relative `weight`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrashBucket {
    pub min: f64,
    pub max: f64,
    pub weight: f64,
}

impl CrashBucket {
    pub const fn new(min: f64, max: f64, weight: f64) -> Self {
        Self { min, max, weight }
    }
}

/// Extra crash gate: a win also requires a draw below `decay^(target - 1)`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashGateConfig {
    pub enabled: bool,
    pub decay: f64,
}

impl Default for CrashGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay: 0.97,
        }
    }
}

/// Initial state of a new player session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub starting_balance: f64,
    pub default_bet_amount: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100.0,
            default_bet_amount: 5.0,
        }
    }
}

/// Logging and metrics configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub enable_logging: bool,
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            enable_logging: true,
            log_level: LogLevel::Info,
        }
    }
}

impl CasinoConfig {
    /// Demo table: generous starting balance, short latency
    pub fn demo() -> Self {
        Self {
            engine: EngineConfig {
                settlement_latency_ms: 300,
                ..Default::default()
            },
            session: SessionConfig {
                starting_balance: 1_000.0,
                default_bet_amount: 10.0,
            },
            ..Default::default()
        }
    }

    /// Zero latency and quiet logging, for tests and simulations
    pub fn testing() -> Self {
        Self {
            engine: EngineConfig {
                settlement_latency_ms: 0,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Warn,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn settlement_latency(&self) -> Duration {
        Duration::from_millis(self.engine.settlement_latency_ms)
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let engine = &self.engine;
        if !engine.payout_multiplier.is_finite() || engine.payout_multiplier <= 0.0 {
            return Err(invalid("engine.payout_multiplier", engine.payout_multiplier, "must be a positive number"));
        }
        if !(0.0..1.0).contains(&engine.platform_fee_rate) {
            return Err(invalid("engine.platform_fee_rate", engine.platform_fee_rate, "must be in [0, 1)"));
        }
        // A winning real bet must always pay something
        if engine.payout_multiplier <= engine.platform_fee_rate {
            return Err(ConfigurationError::ValidationFailed(
                "payout_multiplier must exceed platform_fee_rate".to_string(),
            ));
        }
        if !engine.min_bet.is_finite() || engine.min_bet < 0.0 {
            return Err(invalid("engine.min_bet", engine.min_bet, "must be a non-negative number"));
        }
        for (field, gate) in [
            ("odds.coinflip_win_gate", self.odds.coinflip_win_gate),
            ("odds.dice_win_gate", self.odds.dice_win_gate),
        ] {
            if !(0.0..=1.0).contains(&gate) {
                return Err(invalid(field, gate, "probability must be in [0, 1]"));
            }
        }

        if self.odds.crash_buckets.is_empty() {
            return Err(ConfigurationError::MissingRequired("odds.crash_buckets".to_string()));
        }
        let mut total_weight = 0.0;
        for bucket in &self.odds.crash_buckets {
            if !(bucket.min >= 1.0 && bucket.max > bucket.min && bucket.max.is_finite()) {
                return Err(invalid(
                    "odds.crash_buckets",
                    format!("[{}, {})", bucket.min, bucket.max),
                    "bucket must satisfy 1 <= min < max",
                ));
            }
            if !bucket.weight.is_finite() || bucket.weight < 0.0 {
                return Err(invalid("odds.crash_buckets.weight", bucket.weight, "must be non-negative"));
            }
            total_weight += bucket.weight;
        }
        if total_weight <= 0.0 {
            return Err(ConfigurationError::ValidationFailed(
                "crash bucket weights must not all be zero".to_string(),
            ));
        }
        let decay = self.odds.crash_gate.decay;
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(invalid("odds.crash_gate.decay", decay, "must be in (0, 1]"));
        }

        if !self.session.starting_balance.is_finite() || self.session.starting_balance < 0.0 {
            return Err(invalid("session.starting_balance", self.session.starting_balance, "must be non-negative"));
        }
        if !self.session.default_bet_amount.is_finite() || self.session.default_bet_amount < 0.0 {
            return Err(invalid("session.default_bet_amount", self.session.default_bet_amount, "must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &CasinoConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

/// Apply `CASINO_*` overrides; `lookup` is `std::env::var` outside of tests.
pub fn apply_overrides<F>(config: &mut CasinoConfig, lookup: F) -> CasinoResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("CASINO_STARTING_BALANCE") {
        config.session.starting_balance = parse_override("CASINO_STARTING_BALANCE", value)?;
    }
    if let Some(value) = lookup("CASINO_DEFAULT_BET") {
        config.session.default_bet_amount = parse_override("CASINO_DEFAULT_BET", value)?;
    }
    if let Some(value) = lookup("CASINO_TRIAL_ALLOWANCE") {
        config.engine.trial_allowance = parse_override("CASINO_TRIAL_ALLOWANCE", value)?;
    }
    if let Some(value) = lookup("CASINO_SETTLEMENT_LATENCY_MS") {
        config.engine.settlement_latency_ms = parse_override("CASINO_SETTLEMENT_LATENCY_MS", value)?;
    }
    if let Some(value) = lookup("CASINO_PAYOUT_MULTIPLIER") {
        config.engine.payout_multiplier = parse_override("CASINO_PAYOUT_MULTIPLIER", value)?;
    }
    if let Some(value) = lookup("CASINO_LOG_LEVEL") {
        config.monitoring.log_level = parse_override("CASINO_LOG_LEVEL", value)?;
    }

    Ok(())
}

fn parse_override<T: std::str::FromStr>(field: &str, value: String) -> CasinoResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "could not parse value".to_string(),
        }
        .into()
    })
}
