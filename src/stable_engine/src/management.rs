//! Seams to the collaborators the engine does not own: collateral token
//! ledgers, the stable token and price sources.

use crate::logs::DEBUG;
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;
use stable_token::{StableToken, StableTokenError};
use std::fmt;

/// A single price reading as reported by an external feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceReading {
    /// USD per one whole unit of the asset, scaled by `10^decimals`.
    pub price: i128,
    pub decimals: u8,
    /// False when the feed knows its answer is stale or incomplete.
    pub is_valid: bool,
}

pub trait PriceSource {
    fn latest_price(&self) -> PriceReading;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    InsufficientFunds { balance: U256 },
    InsufficientAllowance { allowance: U256 },
    Unauthorized,
    Rejected(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds { balance } => {
                write!(f, "insufficient funds (balance {})", balance)
            }
            Self::InsufficientAllowance { allowance } => {
                write!(f, "insufficient allowance (allowance {})", allowance)
            }
            Self::Unauthorized => write!(f, "caller is not authorized"),
            Self::Rejected(reason) => write!(f, "transfer rejected: {}", reason),
        }
    }
}

impl From<StableTokenError> for TokenError {
    fn from(e: StableTokenError) -> Self {
        match e {
            StableTokenError::Unauthorized { .. } => Self::Unauthorized,
            StableTokenError::InsufficientFunds { balance } => Self::InsufficientFunds { balance },
            StableTokenError::InsufficientAllowance { allowance } => {
                Self::InsufficientAllowance { allowance }
            }
            StableTokenError::AmountMustBePositive | StableTokenError::Overflow => {
                Self::Rejected(e.to_string())
            }
        }
    }
}

/// Participation in the engine's atomic boundary. The engine opens a
/// transaction on every token collaborator when an operation starts, and
/// either commits or rolls all of them back when it ends.
pub trait Transactional {
    fn begin_transaction(&self);
    fn commit_transaction(&self);
    fn rollback_transaction(&self);
}

/// A collateral asset's token ledger.
pub trait AssetToken: Transactional {
    /// Identity of the asset, used as its key in the collateral ledger.
    fn id(&self) -> Principal;
    fn balance_of(&self, owner: Principal) -> U256;
    /// Moves `from`'s own funds.
    fn transfer(&self, from: Principal, to: Principal, amount: U256) -> Result<(), TokenError>;
    /// Moves funds `from` has approved `spender` to move.
    fn transfer_from(
        &self,
        spender: Principal,
        from: Principal,
        to: Principal,
        amount: U256,
    ) -> Result<(), TokenError>;
}

/// The stable token's supply-control surface. Only the registered controller
/// may mint or burn; the engine must be that controller.
pub trait DebtToken: Transactional {
    fn mint(&self, caller: Principal, to: Principal, amount: U256) -> bool;
    fn burn_from(&self, caller: Principal, from: Principal, amount: U256) -> Result<(), TokenError>;
    fn balance_of(&self, owner: Principal) -> U256;
    fn transfer_from(
        &self,
        spender: Principal,
        from: Principal,
        to: Principal,
        amount: U256,
    ) -> Result<(), TokenError>;
}

impl Transactional for StableToken {
    fn begin_transaction(&self) {
        self.checkpoint();
    }

    fn commit_transaction(&self) {
        self.commit();
    }

    fn rollback_transaction(&self) {
        self.rollback();
    }
}

impl DebtToken for StableToken {
    fn mint(&self, caller: Principal, to: Principal, amount: U256) -> bool {
        match StableToken::mint(self, caller, to, amount) {
            Ok(()) => true,
            Err(e) => {
                log!(DEBUG, "[mint] stable token refused to mint {} to {}: {}", amount, to, e);
                false
            }
        }
    }

    fn burn_from(&self, caller: Principal, from: Principal, amount: U256) -> Result<(), TokenError> {
        StableToken::burn_from(self, caller, from, amount).map_err(TokenError::from)
    }

    fn balance_of(&self, owner: Principal) -> U256 {
        StableToken::balance_of(self, owner)
    }

    fn transfer_from(
        &self,
        spender: Principal,
        from: Principal,
        to: Principal,
        amount: U256,
    ) -> Result<(), TokenError> {
        StableToken::transfer_from(self, spender, from, to, amount).map_err(TokenError::from)
    }
}
