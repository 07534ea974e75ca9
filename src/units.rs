//! Fixed-point conversions between wei and decimal display units

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::probe::errors::ProbeError;

/// Decimals of gwei relative to wei
pub const GWEI_DECIMALS: u32 = 9;

/// Decimals of the native coin relative to wei
pub const NATIVE_DECIMALS: u32 = 18;

/// Convert an integer wei amount into a normalized decimal with `decimals` places.
pub fn from_wei(value: U256, decimals: u32) -> Result<Decimal, ProbeError> {
    let raw = i128::try_from(value)
        .map_err(|_| ProbeError::Configuration(format!("{} wei does not fit a decimal", value)))?;
    let decimal = Decimal::try_from_i128_with_scale(raw, decimals)
        .map_err(|e| ProbeError::Configuration(format!("{} wei does not fit a decimal: {}", value, e)))?;
    Ok(decimal.normalize())
}

/// Convert a decimal amount expressed with `decimals` places into integer wei.
///
/// Rejects negative values and values with more precision than one wei.
pub fn to_wei(value: Decimal, decimals: u32) -> Result<u128, ProbeError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ProbeError::Configuration(format!("negative amount {}", value)));
    }
    let scale = Decimal::from(10u64.pow(decimals));
    let scaled = value
        .checked_mul(scale)
        .ok_or_else(|| ProbeError::Configuration(format!("amount {} overflows", value)))?;
    if !scaled.fract().is_zero() {
        return Err(ProbeError::Configuration(format!(
            "amount {} has more than {} decimals",
            value, decimals
        )));
    }
    scaled
        .to_u128()
        .ok_or_else(|| ProbeError::Configuration(format!("amount {} overflows", value)))
}
