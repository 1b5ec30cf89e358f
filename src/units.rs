//! NEAR <-> yoctoNEAR conversion

use crate::error::{NearCliError, Result};

/// Fractional digits in one NEAR (1 NEAR = 10^24 yoctoNEAR)
pub const NEAR_NOMINATION_EXP: usize = 24;
pub const ONE_NEAR: u128 = 10u128.pow(NEAR_NOMINATION_EXP as u32);

/// Parse a human amount like `"100"`, `"0.5"` or `"1,000"` into yoctoNEAR.
pub fn parse_near_amount(amount: &str) -> Result<u128> {
    let cleaned: String = amount.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(NearCliError::InvalidAmount("empty amount".to_string()));
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(NearCliError::InvalidAmount(amount.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(NearCliError::InvalidAmount(format!("'{}' is not a decimal number", amount)));
    }
    if fraction.len() > NEAR_NOMINATION_EXP {
        return Err(NearCliError::InvalidAmount(format!(
            "'{}' has more than {} fractional digits",
            amount, NEAR_NOMINATION_EXP
        )));
    }

    let overflow = || NearCliError::InvalidAmount(format!("'{}' is too large", amount));
    let whole_yocto = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(ONE_NEAR)
            .ok_or_else(overflow)?
    };
    let fraction_yocto = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = NEAR_NOMINATION_EXP);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_yocto.checked_add(fraction_yocto).ok_or_else(overflow)
}

/// Render yoctoNEAR as NEAR without trailing zeros.
pub fn format_near_amount(yocto: u128) -> String {
    let whole = yocto / ONE_NEAR;
    let fraction = yocto % ONE_NEAR;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0>width$}", fraction, width = NEAR_NOMINATION_EXP);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}
