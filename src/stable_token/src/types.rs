use candid::{CandidType, Deserialize, Principal};
use ethnum::U256;
use serde::Serialize;
use std::fmt;

/// Arguments for initializing the stable token ledger
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StableTokenInitArg {
    /// The only identity allowed to mint and burn (the engine's custody account once wired)
    pub controller: Principal,
    /// Human readable token name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StableTokenError {
    /// The caller is not the registered controller.
    Unauthorized { caller: Principal },
    InsufficientFunds { balance: U256 },
    InsufficientAllowance { allowance: U256 },
    AmountMustBePositive,
    /// The amount would push a balance or the total supply past `U256::MAX`.
    Overflow,
}

impl fmt::Display for StableTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { caller } => {
                write!(f, "caller {} is not the token controller", caller)
            }
            Self::InsufficientFunds { balance } => {
                write!(f, "insufficient funds, balance: {}", balance)
            }
            Self::InsufficientAllowance { allowance } => {
                write!(f, "insufficient allowance, allowance: {}", allowance)
            }
            Self::AmountMustBePositive => write!(f, "amount must be greater than zero"),
            Self::Overflow => write!(f, "amount overflows the token supply"),
        }
    }
}
