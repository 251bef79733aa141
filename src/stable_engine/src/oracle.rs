use crate::logs::TRACE_ORACLE;
use crate::management::PriceSource;
use crate::numeric::{checked_pow10, mul_div_saturating, Usd, DECIMALS, PRECISION};
use crate::ProtocolError;
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;
use std::rc::Rc;

/// Wraps one asset's price source and converts between native amounts and
/// 18-decimal USD. Nothing is cached: every conversion reads the feed again.
#[derive(Clone)]
pub struct OracleAdapter {
    asset: Principal,
    source: Rc<dyn PriceSource>,
}

impl OracleAdapter {
    pub fn new(asset: Principal, source: Rc<dyn PriceSource>) -> Self {
        Self { asset, source }
    }

    pub fn source(&self) -> &Rc<dyn PriceSource> {
        &self.source
    }

    /// Latest price scaled to 18 decimals.
    pub fn normalized_price(&self) -> Result<U256, ProtocolError> {
        let reading = self.source.latest_price();
        if !reading.is_valid || reading.price <= 0 {
            log!(
                TRACE_ORACLE,
                "[normalized_price] unusable reading for {}: price {}, valid {}",
                self.asset,
                reading.price,
                reading.is_valid
            );
            return Err(ProtocolError::OracleUnavailable(self.asset));
        }
        let raw = U256::from(reading.price.unsigned_abs());
        let decimals = u32::from(reading.decimals);
        // a divisor wider than 256 bits leaves nothing of the price
        let normalized = if decimals <= DECIMALS {
            checked_pow10(DECIMALS - decimals).and_then(|scale| raw.checked_mul(scale))
        } else {
            checked_pow10(decimals - DECIMALS).map(|scale| raw / scale)
        }
        .unwrap_or(U256::ZERO);
        if normalized == U256::ZERO {
            log!(
                TRACE_ORACLE,
                "[normalized_price] price of {} rounds to zero at {} decimals",
                self.asset,
                reading.decimals
            );
            return Err(ProtocolError::OracleUnavailable(self.asset));
        }
        log!(
            TRACE_ORACLE,
            "[normalized_price] {}: raw {} ({} decimals) -> {}",
            self.asset,
            reading.price,
            reading.decimals,
            normalized
        );
        Ok(normalized)
    }

    /// `price * amount / 10^18`
    pub fn usd_value(&self, amount: U256) -> Result<Usd, ProtocolError> {
        let price = self.normalized_price()?;
        Ok(Usd::new(mul_div_saturating(price, amount, PRECISION)))
    }

    /// `usd * 10^18 / price`
    pub fn token_amount_for_usd(&self, usd: Usd) -> Result<U256, ProtocolError> {
        let price = self.normalized_price()?;
        Ok(mul_div_saturating(usd.to_u256(), PRECISION, price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxPriceFeed;
    use assert_matches::assert_matches;

    fn asset() -> Principal {
        Principal::from_slice(&[42])
    }

    fn adapter(feed: &Rc<SandboxPriceFeed>) -> OracleAdapter {
        OracleAdapter::new(asset(), feed.clone())
    }

    #[test]
    fn test_eight_decimal_feed_is_scaled_by_1e10() {
        let feed = Rc::new(SandboxPriceFeed::new(2_000 * 100_000_000, 8));
        assert_eq!(
            adapter(&feed).normalized_price().unwrap(),
            U256::new(2_000) * PRECISION
        );
    }

    #[test]
    fn test_usd_value_of_ten_units() {
        let feed = Rc::new(SandboxPriceFeed::new(2_000 * 100_000_000, 8));
        let ten_units = U256::new(10) * PRECISION;
        assert_eq!(
            adapter(&feed).usd_value(ten_units).unwrap(),
            Usd::from_whole(20_000)
        );
    }

    #[test]
    fn test_token_amount_for_usd() {
        let feed = Rc::new(SandboxPriceFeed::new(2_000 * 100_000_000, 8));
        // $100 at $2000/unit is 0.05 units
        assert_eq!(
            adapter(&feed).token_amount_for_usd(Usd::from_whole(100)).unwrap(),
            PRECISION / 20
        );
    }

    #[test]
    fn test_feeds_with_more_than_18_decimals() {
        let feed = Rc::new(SandboxPriceFeed::new(3 * 10i128.pow(20), 20));
        assert_eq!(
            adapter(&feed).normalized_price().unwrap(),
            U256::new(3) * PRECISION
        );
    }

    #[test]
    fn test_unrepresentable_decimals_are_unavailable() {
        let feed = Rc::new(SandboxPriceFeed::new(2_000 * 100_000_000, 8));
        feed.set_decimals(100);
        assert_matches!(
            adapter(&feed).usd_value(U256::ONE),
            Err(ProtocolError::OracleUnavailable(a)) if a == asset()
        );
        feed.set_decimals(u8::MAX);
        assert_matches!(
            adapter(&feed).normalized_price(),
            Err(ProtocolError::OracleUnavailable(_))
        );
        // 10^77 still fits, the price just rounds away
        feed.set_decimals(95);
        assert_matches!(
            adapter(&feed).normalized_price(),
            Err(ProtocolError::OracleUnavailable(_))
        );
    }

    #[test]
    fn test_invalid_or_non_positive_readings_fail() {
        let feed = Rc::new(SandboxPriceFeed::new(0, 8));
        assert_matches!(
            adapter(&feed).usd_value(U256::ONE),
            Err(ProtocolError::OracleUnavailable(a)) if a == asset()
        );

        feed.set_price(-5);
        assert_matches!(
            adapter(&feed).normalized_price(),
            Err(ProtocolError::OracleUnavailable(_))
        );

        feed.set_price(1_000);
        feed.set_valid(false);
        assert_matches!(
            adapter(&feed).token_amount_for_usd(Usd::from_whole(1)),
            Err(ProtocolError::OracleUnavailable(_))
        );
    }

    #[test]
    fn test_every_conversion_refetches() {
        let feed = Rc::new(SandboxPriceFeed::new(2_000 * 100_000_000, 8));
        let oracle = adapter(&feed);
        assert_eq!(oracle.usd_value(PRECISION).unwrap(), Usd::from_whole(2_000));
        feed.set_price(1_000 * 100_000_000);
        assert_eq!(oracle.usd_value(PRECISION).unwrap(), Usd::from_whole(1_000));
    }
}
