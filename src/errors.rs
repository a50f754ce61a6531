//! Error types for the casino engine
//!
//! Bet rejections are the everyday case and carry enough detail for a
//! user-visible message. Everything else rolls up into [`CasinoError`].

use std::fmt;

/// Root error type for all casino operations
#[derive(Debug)]
pub enum CasinoError {
    /// Configuration loading and validation errors
    Configuration(ConfigurationError),

    /// A wager was rejected before settlement
    Bet(BetError),

    /// Wallet / funding source errors
    Funding(FundingError),

    /// Provably fair randomness errors
    Fairness(FairnessError),
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
    SaveFailed(String),
}

/// Reasons a call to `place_bet` does not proceed.
///
/// Every variant leaves the session exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BetError {
    #[error("Player is not authenticated")]
    NotAuthenticated,

    #[error("Invalid bet amount: {0}")]
    InvalidAmount(f64),

    #[error("Insufficient balance: bet {required}, available {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("No trial plays left")]
    NoTrialsLeft,

    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("A bet is already being settled for this session")]
    SettlementInProgress,

    #[error("Stake transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Settlement task aborted: {0}")]
    SettlementAborted(String),
}

/// Wallet / funding source errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FundingError {
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Stake submission rejected: {0}")]
    SubmissionRejected(String),
}

/// VRF generation / verification errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FairnessError {
    #[error("Invalid hex in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

impl fmt::Display for CasinoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasinoError::Configuration(e) => write!(f, "Configuration error: {}", e),
            CasinoError::Bet(e) => write!(f, "Bet rejected: {}", e),
            CasinoError::Funding(e) => write!(f, "Funding error: {}", e),
            CasinoError::Fairness(e) => write!(f, "Fairness error: {}", e),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigurationError::SaveFailed(msg) => write!(f, "Failed to save configuration: {}", msg),
        }
    }
}

impl std::error::Error for CasinoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CasinoError::Configuration(e) => Some(e),
            CasinoError::Bet(e) => Some(e),
            CasinoError::Funding(e) => Some(e),
            CasinoError::Fairness(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for CasinoError {
    fn from(e: ConfigurationError) -> Self {
        CasinoError::Configuration(e)
    }
}

impl From<BetError> for CasinoError {
    fn from(e: BetError) -> Self {
        CasinoError::Bet(e)
    }
}

impl From<FundingError> for CasinoError {
    fn from(e: FundingError) -> Self {
        CasinoError::Funding(e)
    }
}

impl From<FairnessError> for CasinoError {
    fn from(e: FairnessError) -> Self {
        CasinoError::Fairness(e)
    }
}

impl From<FundingError> for BetError {
    fn from(e: FundingError) -> Self {
        BetError::TransactionFailed(e.to_string())
    }
}

// External error conversions
impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for CasinoError {
    fn from(e: toml::de::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }
}

impl From<serde_json::Error> for CasinoError {
    fn from(e: serde_json::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let config_error = ConfigurationError::ValidationFailed("test".to_string());
        let casino_error = CasinoError::Configuration(config_error);

        assert!(casino_error.to_string().contains("Configuration error"));
        assert!(casino_error.to_string().contains("test"));
    }

    #[test]
    fn test_insufficient_balance_details() {
        let err = BetError::InsufficientBalance {
            required: 25.0,
            available: 10.0,
        };

        assert!(err.to_string().contains("bet 25"));
        assert!(err.to_string().contains("available 10"));
    }

    #[test]
    fn test_funding_error_becomes_transaction_failure() {
        let err: BetError = FundingError::SubmissionRejected("nonce".to_string()).into();
        match err {
            BetError::TransactionFailed(msg) => assert!(msg.contains("nonce")),
            other => panic!("Expected transaction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source() {
        let casino_error: CasinoError = BetError::NoTrialsLeft.into();
        assert!(casino_error.source().is_some());
        assert!(casino_error.to_string().starts_with("Bet rejected"));
    }
}
