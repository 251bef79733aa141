//! Fixed-point amounts on 256-bit integers.
//!
//! USD values, stable-token amounts and health factors all carry 18 decimals.
//! Raw collateral amounts stay plain `U256` in the asset's native units.

use ethnum::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

pub const DECIMALS: u32 = 18;
pub const PRECISION: U256 = U256::new(1_000_000_000_000_000_000);

/// `10^exp`, or `None` past `10^77`.
pub fn checked_pow10(exp: u32) -> Option<U256> {
    U256::new(10).checked_pow(exp)
}

/// Full 256x256 -> 512 bit product, returned as (high, low).
fn full_mul(a: U256, b: U256) -> (U256, U256) {
    let (a_hi, a_lo) = a.into_words();
    let (b_hi, b_lo) = b.into_words();

    let lo_lo = U256::from(a_lo) * U256::from(b_lo);
    let hi_hi = U256::from(a_hi) * U256::from(b_hi);
    let (cross, cross_carry) =
        (U256::from(a_lo) * U256::from(b_hi)).overflowing_add(U256::from(a_hi) * U256::from(b_lo));

    let (low, low_carry) = lo_lo.overflowing_add(cross << 128);
    let mut high = hi_hi + (cross >> 128);
    if cross_carry {
        high += U256::ONE << 128;
    }
    if low_carry {
        high += U256::ONE;
    }
    (high, low)
}

/// `a * b / d` rounded toward zero, with a 512-bit intermediate product.
/// Returns `None` when `d` is zero or the quotient does not fit in 256 bits.
pub fn mul_div(a: U256, b: U256, d: U256) -> Option<U256> {
    if d == U256::ZERO {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / d);
    }
    let (high, low) = full_mul(a, b);
    if high >= d {
        return None;
    }
    let mut remainder = high;
    let mut quotient = U256::ZERO;
    for bit in (0..256u32).rev() {
        let carry = remainder >> 255u32 == U256::ONE;
        remainder = (remainder << 1u32) | ((low >> bit) & U256::ONE);
        quotient <<= 1u32;
        if carry || remainder >= d {
            remainder = remainder.wrapping_sub(d);
            quotient |= U256::ONE;
        }
    }
    Some(quotient)
}

/// Same as [`mul_div`] but pins an unrepresentable quotient at `U256::MAX`.
pub fn mul_div_saturating(a: U256, b: U256, d: U256) -> U256 {
    mul_div(a, b, d).unwrap_or(U256::MAX)
}

fn fmt_fixed(value: U256, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let whole = value / PRECISION;
    let frac = value % PRECISION;
    if frac == U256::ZERO {
        return write!(f, "{}", whole);
    }
    let digits = format!("{:018}", frac.as_u128());
    write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
}

/// An 18-decimal USD amount. One stable token is worth exactly one `Usd` unit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Usd(#[serde(with = "ethnum::serde::decimal")] U256);

impl Usd {
    pub const ZERO: Usd = Usd(U256::ZERO);
    pub const MAX: Usd = Usd(U256::MAX);

    pub const fn new(raw: U256) -> Self {
        Self(raw)
    }

    /// Whole dollars, scaled to 18 decimals.
    pub fn from_whole(dollars: u128) -> Self {
        Self(U256::from(dollars) * PRECISION)
    }

    pub const fn to_u256(self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }

    pub fn checked_add(self, other: Usd) -> Option<Usd> {
        self.0.checked_add(other.0).map(Usd)
    }

    pub fn checked_sub(self, other: Usd) -> Option<Usd> {
        self.0.checked_sub(other.0).map(Usd)
    }

    pub fn saturating_add(self, other: Usd) -> Usd {
        Usd(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Usd) -> Usd {
        Usd(self.0.saturating_sub(other.0))
    }

    /// `self * numerator / denominator`, saturating.
    pub fn mul_ratio(self, numerator: U256, denominator: U256) -> Usd {
        Usd(mul_div_saturating(self.0, numerator, denominator))
    }
}

impl From<U256> for Usd {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl From<u128> for Usd {
    fn from(raw: u128) -> Self {
        Self(U256::from(raw))
    }
}

impl Add for Usd {
    type Output = Usd;

    fn add(self, other: Usd) -> Usd {
        Usd(self.0 + other.0)
    }
}

impl AddAssign for Usd {
    fn add_assign(&mut self, other: Usd) {
        self.0 += other.0;
    }
}

impl Sub for Usd {
    type Output = Usd;

    fn sub(self, other: Usd) -> Usd {
        Usd(self.0 - other.0)
    }
}

impl SubAssign for Usd {
    fn sub_assign(&mut self, other: Usd) {
        self.0 -= other.0;
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Usd>>(iter: I) -> Usd {
        iter.fold(Usd::ZERO, Usd::saturating_add)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, f)
    }
}

/// Risk-adjusted collateral value over debt, at 18 decimals. `1.0` is `10^18`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HealthFactor(#[serde(with = "ethnum::serde::decimal")] U256);

impl HealthFactor {
    /// Reported for positions without debt.
    pub const MAX: HealthFactor = HealthFactor(U256::MAX);

    pub const fn new(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn to_u256(self) -> U256 {
        self.0
    }

    pub fn is_max(&self) -> bool {
        self.0 == U256::MAX
    }
}

impl From<U256> for HealthFactor {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            return write!(f, "max");
        }
        fmt_fixed(self.0, f)
    }
}
