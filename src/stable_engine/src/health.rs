use crate::engine::Engine;
use crate::logs::DEBUG;
use crate::numeric::{mul_div_saturating, HealthFactor, Usd, PRECISION};
use crate::{ProtocolError, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MIN_HEALTH_FACTOR};
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;

/// `collateral * 50 / 100 * 10^18 / debt`, or [`HealthFactor::MAX`] without debt.
pub fn calculate_health_factor(debt: Usd, collateral_value_usd: Usd) -> HealthFactor {
    if debt.is_zero() {
        return HealthFactor::MAX;
    }
    let adjusted = collateral_value_usd.mul_ratio(
        U256::from(LIQUIDATION_THRESHOLD),
        U256::from(LIQUIDATION_PRECISION),
    );
    HealthFactor::new(mul_div_saturating(
        adjusted.to_u256(),
        PRECISION,
        debt.to_u256(),
    ))
}

impl Engine {
    pub fn health_factor(&self, user: Principal) -> Result<HealthFactor, ProtocolError> {
        let debt = self.read_state(|s| s.debt_of(&user));
        if debt.is_zero() {
            return Ok(HealthFactor::MAX);
        }
        let collateral_value = self.total_collateral_value_usd(user)?;
        Ok(calculate_health_factor(debt, collateral_value))
    }

    pub(crate) fn assert_healthy(&self, user: Principal) -> Result<(), ProtocolError> {
        let health_factor = self.health_factor(user)?;
        if health_factor < MIN_HEALTH_FACTOR {
            log!(
                DEBUG,
                "[assert_healthy] health factor of {} is {}, below the minimum",
                user,
                health_factor
            );
            return Err(ProtocolError::HealthFactorBroken(health_factor));
        }
        Ok(())
    }
}
