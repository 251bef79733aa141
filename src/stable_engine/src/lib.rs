use crate::guard::GuardError;
use crate::management::TokenError;
use crate::numeric::{HealthFactor, Usd, PRECISION};
use candid::Principal;
use ethnum::U256;
use std::fmt;

pub mod collateral;
pub mod debt;
pub mod engine;
pub mod event;
pub mod guard;
pub mod health;
pub mod liquidation;
pub mod logs;
pub mod management;
pub mod numeric;
pub mod oracle;
pub mod position;
pub mod sandbox;
pub mod state;
pub mod storage;

pub use crate::engine::{Engine, InitArg};
pub use crate::health::calculate_health_factor;
pub use crate::liquidation::LiquidationReceipt;

/// Share of collateral value, in percent, that counts toward backing debt.
/// 50 means positions must stay 200% collateralized.
pub const LIQUIDATION_THRESHOLD: u128 = 50;
pub const LIQUIDATION_PRECISION: u128 = 100;
/// Extra collateral, in percent of the repaid amount, paid to a liquidator.
pub const LIQUIDATION_BONUS: u128 = 10;
/// 1.0 at the health factor's 18-decimal scale.
pub const MIN_HEALTH_FACTOR: HealthFactor = HealthFactor::new(PRECISION);
/// Decimals the common price feed reports with.
pub const FEED_DECIMALS: u8 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    AmountMustBePositive,
    AssetNotAllowed(Principal),
    ConfigLengthMismatch {
        assets: usize,
        price_sources: usize,
    },
    DuplicateCollateral(Principal),
    InsufficientCollateral {
        asset: Principal,
        available: U256,
        requested: U256,
    },
    InsufficientDebt {
        available: Usd,
        requested: Usd,
    },
    HealthFactorBroken(HealthFactor),
    HealthFactorOk(HealthFactor),
    HealthFactorNotImproved {
        before: HealthFactor,
        after: HealthFactor,
    },
    OracleUnavailable(Principal),
    MintFailed,
    TransferFailed(TokenError),
    ReentrantCall,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmountMustBePositive => write!(f, "amount must be greater than zero"),
            Self::AssetNotAllowed(asset) => write!(f, "{} is not an approved collateral", asset),
            Self::ConfigLengthMismatch {
                assets,
                price_sources,
            } => write!(
                f,
                "{} collateral assets configured with {} price sources",
                assets, price_sources
            ),
            Self::DuplicateCollateral(asset) => {
                write!(f, "collateral {} is configured more than once", asset)
            }
            Self::InsufficientCollateral {
                asset,
                available,
                requested,
            } => write!(
                f,
                "insufficient collateral of {}: {} available, {} requested",
                asset, available, requested
            ),
            Self::InsufficientDebt {
                available,
                requested,
            } => write!(
                f,
                "insufficient debt: {} outstanding, {} requested",
                available, requested
            ),
            Self::HealthFactorBroken(hf) => write!(f, "health factor {} is below 1", hf),
            Self::HealthFactorOk(hf) => {
                write!(f, "health factor {} is not below 1, nothing to liquidate", hf)
            }
            Self::HealthFactorNotImproved { before, after } => write!(
                f,
                "liquidation did not improve the health factor ({} -> {})",
                before, after
            ),
            Self::OracleUnavailable(asset) => write!(f, "no usable price for {}", asset),
            Self::MintFailed => write!(f, "the stable token refused to mint"),
            Self::TransferFailed(e) => write!(f, "token transfer failed: {}", e),
            Self::ReentrantCall => write!(f, "another operation is already in progress"),
        }
    }
}

impl From<GuardError> for ProtocolError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::AlreadyProcessing => Self::ReentrantCall,
        }
    }
}

impl From<TokenError> for ProtocolError {
    fn from(e: TokenError) -> Self {
        Self::TransferFailed(e)
    }
}
