use crate::engine::Engine;
use crate::event::record_liquidated;
use crate::logs::{DEBUG, INFO};
use crate::numeric::{mul_div_saturating, HealthFactor, Usd};
use crate::{ProtocolError, LIQUIDATION_BONUS, LIQUIDATION_PRECISION, MIN_HEALTH_FACTOR};
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationReceipt {
    pub debt_covered: Usd,
    #[serde(with = "ethnum::serde::decimal")]
    pub collateral_seized: U256,
    #[serde(with = "ethnum::serde::decimal")]
    pub bonus: U256,
    pub health_factor_before: HealthFactor,
    pub health_factor_after: HealthFactor,
}

impl Engine {
    /// Repays `debt_to_cover` of `user`'s debt with the liquidator's tokens and
    /// pays the liquidator the equivalent amount of `collateral_asset` plus a
    /// 10% bonus, taken from `user`'s deposit.
    ///
    /// Only positions below the minimum health factor can be liquidated, and
    /// the liquidation must leave the target strictly healthier than before.
    pub fn liquidate(
        &self,
        liquidator: Principal,
        collateral_asset: Principal,
        user: Principal,
        debt_to_cover: Usd,
    ) -> Result<LiquidationReceipt, ProtocolError> {
        self.execute("liquidate", || {
            self.liquidate_internal(liquidator, collateral_asset, user, debt_to_cover)
        })
    }

    fn liquidate_internal(
        &self,
        liquidator: Principal,
        collateral_asset: Principal,
        user: Principal,
        debt_to_cover: Usd,
    ) -> Result<LiquidationReceipt, ProtocolError> {
        if debt_to_cover.is_zero() {
            return Err(ProtocolError::AmountMustBePositive);
        }
        let oracle = self.registry().get(&collateral_asset)?.oracle().clone();

        let health_factor_before = self.health_factor(user)?;
        if health_factor_before >= MIN_HEALTH_FACTOR {
            log!(
                DEBUG,
                "[liquidate] {} is healthy at {}",
                user,
                health_factor_before
            );
            return Err(ProtocolError::HealthFactorOk(health_factor_before));
        }

        let base = oracle.token_amount_for_usd(debt_to_cover)?;
        let bonus = mul_div_saturating(
            base,
            U256::from(LIQUIDATION_BONUS),
            U256::from(LIQUIDATION_PRECISION),
        );
        let collateral_seized = match base.checked_add(bonus) {
            Some(total) => total,
            None => {
                return Err(ProtocolError::InsufficientCollateral {
                    asset: collateral_asset,
                    available: self.collateral_balance(user, collateral_asset),
                    requested: U256::MAX,
                })
            }
        };

        self.record_withdrawal(user, liquidator, collateral_asset, collateral_seized)?;
        self.record_burn(user, liquidator, debt_to_cover)?;

        let health_factor_after = self.health_factor(user)?;
        if health_factor_after <= health_factor_before {
            log!(
                DEBUG,
                "[liquidate] health factor of {} went from {} to {}",
                user,
                health_factor_before,
                health_factor_after
            );
            return Err(ProtocolError::HealthFactorNotImproved {
                before: health_factor_before,
                after: health_factor_after,
            });
        }
        self.assert_healthy(liquidator)?;

        self.mutate_state(|s| {
            record_liquidated(
                s,
                liquidator,
                user,
                collateral_asset,
                debt_to_cover,
                collateral_seized,
            )
        });
        log!(
            INFO,
            "[liquidate] {} covered {} of {}'s debt and seized {} of {} (health factor {} -> {})",
            liquidator,
            debt_to_cover,
            user,
            collateral_seized,
            collateral_asset,
            health_factor_before,
            health_factor_after
        );
        Ok(LiquidationReceipt {
            debt_covered: debt_to_cover,
            collateral_seized,
            bonus,
            health_factor_before,
            health_factor_after,
        })
    }
}
