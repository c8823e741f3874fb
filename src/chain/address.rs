use alloy::primitives::Address;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    MissingPrefix(String),
    InvalidLength { input: String, len: usize },
    InvalidHex(String),
    InvalidChecksum { input: String, expected: String },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::MissingPrefix(input) => {
                write!(f, "address \"{input}\" must start with 0x")
            }
            AddressError::InvalidLength { input, len } => write!(
                f,
                "address \"{input}\" has {len} hex digits, expected 40"
            ),
            AddressError::InvalidHex(input) => {
                write!(f, "address \"{input}\" contains non-hex characters")
            }
            AddressError::InvalidChecksum { input, expected } => write!(
                f,
                "address \"{input}\" has an invalid EIP-55 checksum (expected {expected})"
            ),
        }
    }
}

impl std::error::Error for AddressError {}

/// Parses a configured address exactly as given. Mixed-case input must carry
/// a valid EIP-55 checksum; all-lowercase and all-uppercase input is accepted
/// as-is. The canonical form is `Address::to_checksum`.
pub fn resolve_address(input: &str) -> Result<Address, AddressError> {
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| AddressError::MissingPrefix(input.to_string()))?;
    if digits.len() != 40 {
        return Err(AddressError::InvalidLength {
            input: input.to_string(),
            len: digits.len(),
        });
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidHex(input.to_string()));
    }

    let address =
        Address::from_str(input).map_err(|_| AddressError::InvalidHex(input.to_string()))?;

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = address.to_checksum(None);
        if expected != input {
            return Err(AddressError::InvalidChecksum {
                input: input.to_string(),
                expected,
            });
        }
    }

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANVIL_ZERO_LOWER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const ANVIL_ZERO_CHECKSUM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn checksummed(input: &str) -> String {
        resolve_address(input).unwrap().to_checksum(None)
    }

    #[test]
    fn lowercase_address_is_checksummed() {
        assert_eq!(checksummed(ANVIL_ZERO_LOWER), ANVIL_ZERO_CHECKSUM);
    }

    #[test]
    fn uppercase_address_is_accepted() {
        let upper = format!("0x{}", ANVIL_ZERO_LOWER[2..].to_ascii_uppercase());
        assert_eq!(checksummed(&upper), ANVIL_ZERO_CHECKSUM);
    }

    #[test]
    fn resolution_is_idempotent() {
        for input in [
            ANVIL_ZERO_LOWER,
            ANVIL_ZERO_CHECKSUM,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0x0000000000000000000000000000000000000000",
        ] {
            let once = checksummed(input);
            let twice = checksummed(&once);
            assert_eq!(once, twice, "input {input}");
        }
    }

    #[test]
    fn bad_mixed_case_checksum_is_rejected() {
        let err = resolve_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap_err();
        assert!(matches!(err, AddressError::InvalidChecksum { ref expected, .. }
            if expected == "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(matches!(
            resolve_address("deployedContractAddress"),
            Err(AddressError::MissingPrefix(_))
        ));
        assert!(matches!(
            resolve_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            Err(AddressError::MissingPrefix(_))
        ));
        assert!(matches!(
            resolve_address("0xf39fd6e5"),
            Err(AddressError::InvalidLength { len: 8, .. })
        ));
        assert!(matches!(
            resolve_address("0xz39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn padded_input_is_rejected() {
        assert!(matches!(
            resolve_address(&format!(" {ANVIL_ZERO_LOWER}")),
            Err(AddressError::MissingPrefix(_))
        ));
        assert!(matches!(
            resolve_address(&format!("{ANVIL_ZERO_LOWER}\n")),
            Err(AddressError::InvalidLength { len: 41, .. })
        ));
    }
}
