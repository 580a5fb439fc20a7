//! Fixed-point U256 arithmetic for monetary calculations.
//!
//! Amounts are carried as raw atomic-unit magnitudes; exchange rates and
//! liquidation incentives are WAD-scaled (18 decimals) ratios. Keeping
//! everything in native U256 avoids round-tripping through strings or
//! floats in the per-block evaluation path.

use alloy::primitives::U256;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Permill denominator (1_000_000 = 100%), matching the chain's encoding
/// of fractional market parameters.
pub const PERMILL_DENOMINATOR: U256 = U256::from_limbs([1_000_000u64, 0, 0, 0]);

/// Pre-computed powers of 10 for fast decimal conversion.
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Fast power of 10 lookup (up to 10^38).
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    if exp < 39 {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// Multiply a magnitude by a WAD-scaled ratio: (value * ratio) / 1e18.
///
/// Used for exchange-rate conversion and the liquidation-incentive
/// premium. Truncates toward zero.
#[inline(always)]
pub fn wad_mul(value: U256, ratio_wad: U256) -> U256 {
    (value * ratio_wad) / WAD
}

/// Divide two magnitudes into a WAD-scaled ratio: (a * 1e18) / b.
///
/// Returns U256::MAX on a zero denominator.
#[inline(always)]
pub fn wad_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::MAX;
    }
    (a * WAD) / b
}

/// Apply a permill fraction: (value * parts) / 1_000_000.
///
/// Example: permill_mul(40, 500_000) = 20 (50% close factor).
#[inline(always)]
pub fn permill_mul(value: U256, parts: u32) -> U256 {
    (value * U256::from(parts)) / PERMILL_DENOMINATOR
}

/// Convert an atomic-unit magnitude to f64 whole units for display.
/// Not for computation.
#[inline(always)]
pub fn to_f64_lossy(value: U256, decimals: u8) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    if value <= U256::from(u128::MAX) {
        let raw: u128 = value.to();
        raw as f64 / scale
    } else {
        let limbs = value.as_limbs();
        let mut acc = 0f64;
        for (i, limb) in limbs.iter().enumerate() {
            acc += *limb as f64 * 2f64.powi(64 * i as i32);
        }
        acc / scale
    }
}

/// Minimum of two U256 values.
#[inline(always)]
pub fn min(a: U256, b: U256) -> U256 {
    if a < b {
        a
    } else {
        b
    }
}

/// Maximum of two U256 values.
#[inline(always)]
pub fn max(a: U256, b: U256) -> U256 {
    if a > b {
        a
    } else {
        b
    }
}
