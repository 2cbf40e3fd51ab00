use ethers::{types::Address, utils::to_checksum};
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Validates `input` as an EVM address and returns its EIP-55 checksummed form.
///
/// The lowercase `0x` prefix is optional; `0X` and surrounding whitespace are
/// rejected. All-lowercase and all-uppercase hex are accepted as-is; mixed case
/// must already carry a valid checksum.
pub fn normalize_address(input: &str) -> Result<String> {
    let hex_part = input.strip_prefix("0x").unwrap_or(input);

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(input));
    }

    let address = Address::from_str(hex_part).map_err(|_| invalid(input))?;
    let checksummed = to_checksum(&address, None);

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksummed[2..] != *hex_part {
        return Err(AppError::InvalidAddress(format!(
            "bad address checksum: {}",
            input
        )));
    }

    Ok(checksummed)
}

fn invalid(input: &str) -> AppError {
    AppError::InvalidAddress(format!("not a valid address: {}", input))
}
