//! Recipient address validation.
//!
//! Runs before any sequence is acquired or any node is contacted, so a
//! malformed address never costs a nonce.

use alloy::primitives::{hex, Address};
use thiserror::Error;

const ADDRESS_PREFIX: &str = "0x";
const ADDRESS_HEX_LEN: usize = 40;

/// Reasons an address string is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must start with '0x'")]
    MissingPrefix,

    #[error("address must have 40 hex characters after '0x', got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidCharacter,

    #[error("address checksum does not match (expected {expected})")]
    BadChecksum { expected: String },

    #[error("zero address cannot be funded")]
    ZeroAddress,

    #[error("faucet cannot fund its own address")]
    SelfTransfer,
}

/// Parse and validate a recipient address.
///
/// Accepts `0x` followed by 40 hex characters. Mixed-case input must carry a
/// valid EIP-55 checksum; uniformly cased input is accepted as-is.
pub fn validate_address(input: &str) -> Result<Address, AddressError> {
    let input = input.trim();
    let digits = input
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or(AddressError::MissingPrefix)?;

    if digits.len() != ADDRESS_HEX_LEN {
        return Err(AddressError::InvalidLength(digits.len()));
    }

    // hex::decode would strip a second "0x" and return 19 bytes.
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidCharacter);
    }
    let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidCharacter)?;
    let address =
        Address::try_from(bytes.as_slice()).map_err(|_| AddressError::InvalidLength(bytes.len() * 2))?;

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = address.to_checksum(None);
        if expected != input {
            return Err(AddressError::BadChecksum { expected });
        }
    }

    if address == Address::ZERO {
        return Err(AddressError::ZeroAddress);
    }

    Ok(address)
}

/// Validate a recipient address and refuse the faucet's own account.
pub fn validate_recipient(input: &str, funding_address: Address) -> Result<Address, AddressError> {
    let address = validate_address(input)?;
    if address == funding_address {
        return Err(AddressError::SelfTransfer);
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_accepts_checksummed_and_uniform_case() {
        let expected: Address = CHECKSUMMED.parse().unwrap();
        assert_eq!(validate_address(CHECKSUMMED).unwrap(), expected);
        assert_eq!(validate_address(&CHECKSUMMED.to_lowercase()).unwrap(), expected);

        let upper = format!("0x{}", CHECKSUMMED[2..].to_uppercase());
        assert_eq!(validate_address(&upper).unwrap(), expected);
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        assert_eq!(
            validate_address("core1hrlnys435ph2gehthddlg2g2s246my30q0gfs2"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(validate_address(""), Err(AddressError::MissingPrefix));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(validate_address("0x1234"), Err(AddressError::InvalidLength(4)));
        let long = format!("{}00", CHECKSUMMED);
        assert_eq!(validate_address(&long), Err(AddressError::InvalidLength(42)));
    }

    #[test]
    fn test_rejects_non_hex() {
        let bad = format!("0x{}", "g".repeat(40));
        assert_eq!(validate_address(&bad), Err(AddressError::InvalidCharacter));
    }

    #[test]
    fn test_rejects_doubled_prefix() {
        let doubled = format!("0x0x{}", "1".repeat(38));
        assert_eq!(validate_address(&doubled), Err(AddressError::InvalidCharacter));
        let doubled_upper = format!("0x0X{}", "a".repeat(38));
        assert_eq!(validate_address(&doubled_upper), Err(AddressError::InvalidCharacter));
    }

    #[test]
    fn test_rejects_bad_checksum() {
        // Flip the case of one letter in a valid checksummed address.
        let broken = CHECKSUMMED.replacen("0xf39Fd", "0xf39fd", 1);
        assert!(matches!(
            validate_address(&broken),
            Err(AddressError::BadChecksum { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_and_self() {
        let zero = format!("0x{}", "0".repeat(40));
        assert_eq!(validate_address(&zero), Err(AddressError::ZeroAddress));

        let funding: Address = CHECKSUMMED.parse().unwrap();
        assert_eq!(
            validate_recipient(CHECKSUMMED, funding),
            Err(AddressError::SelfTransfer)
        );
    }
}
