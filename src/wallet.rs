//! Funding sources
//!
//! A session either spends its own simulated balance or reads the balance of a
//! connected wallet. On-chain transfers are out of reach here: stake submission
//! goes through [`WalletConnector::submit_stake`], which the bundled
//! [`ReadOnlyWallet`] only acknowledges.

use crate::errors::FundingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Stake the engine asks a wallet to move before settling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StakeTransfer {
    pub bet_id: String,
    pub from_address: String,
    pub amount: f64,
}

/// Externally connected wallet
#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn address(&self) -> &str;

    /// Current spendable balance
    async fn balance(&self) -> Result<f64, FundingError>;

    /// Submit a stake transfer and return its transaction reference
    async fn submit_stake(&self, transfer: &StakeTransfer) -> Result<String, FundingError>;
}

/// Where a session's stakes come from
#[derive(Clone)]
pub enum FundingSource {
    /// Balance owned and mutated by the session
    Simulated,
    /// Balance read from a wallet the engine never debits itself
    Wallet(Arc<dyn WalletConnector>),
}

impl FundingSource {
    pub fn is_simulated(&self) -> bool {
        matches!(self, FundingSource::Simulated)
    }
}

impl std::fmt::Debug for FundingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundingSource::Simulated => write!(f, "Simulated"),
            FundingSource::Wallet(w) => write!(f, "Wallet({})", w.address()),
        }
    }
}

/// Wallet stub with an externally maintained balance
pub struct ReadOnlyWallet {
    address: String,
    balance: RwLock<f64>,
}

impl ReadOnlyWallet {
    pub fn new(address: impl Into<String>, balance: f64) -> Self {
        Self {
            address: address.into(),
            balance: RwLock::new(balance),
        }
    }

    /// Reflect a balance change observed on chain
    pub fn set_balance(&self, balance: f64) {
        if let Ok(mut current) = self.balance.write() {
            *current = balance;
        }
    }
}

#[async_trait]
impl WalletConnector for ReadOnlyWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn balance(&self) -> Result<f64, FundingError> {
        self.balance
            .read()
            .map(|b| *b)
            .map_err(|_| FundingError::WalletUnavailable(self.address.clone()))
    }

    async fn submit_stake(&self, transfer: &StakeTransfer) -> Result<String, FundingError> {
        // Placeholder reference until a chain client exists
        tracing::debug!(
            bet_id = %transfer.bet_id,
            address = %self.address,
            amount = transfer.amount,
            "Acknowledging stake transfer without submitting on chain"
        );
        Ok(format!("stub:{}", transfer.bet_id))
    }
}
