//! EVM address validation

use super::constants::ADDRESS_HEX_LEN;

/// Check `^0x[0-9a-fA-F]{40}$`.
///
/// Only the lowercase `0x` prefix is accepted, matching the check command
/// pattern.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex_part) => {
            hex_part.len() == ADDRESS_HEX_LEN
                && hex_part.is_ascii()
                && hex::decode(hex_part).is_ok()
        }
        None => false,
    }
}

/// Shorten an address for log lines: `0x1234…7890`
pub fn short_address(address: &str) -> String {
    if address.len() <= 12 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
