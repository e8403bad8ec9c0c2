use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// The all-zero address, used where a contract expects "no operator".
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Derives an EIP-55 checksummed Ethereum address from an uncompressed secp256k1
/// public key (65 bytes, starting with 0x04).
///
/// The derivation takes the Keccak-256 hash of the 64-byte public key (without
/// the 0x04 prefix) and uses the last 20 bytes as the address.
pub fn pubkey_to_eth_address(uncompressed_pubkey: &[u8; 65]) -> Result<String, EthError> {
    if uncompressed_pubkey[0] != 0x04 {
        return Err(EthError::InvalidPublicKey(
            "uncompressed key must start with 0x04".into(),
        ));
    }

    let hash = Keccak256::digest(&uncompressed_pubkey[1..]);

    // Last 20 bytes are the raw address.
    let mut addr_bytes = [0u8; 20];
    addr_bytes.copy_from_slice(&hash[12..]);

    Ok(to_checksum(&addr_bytes))
}

/// Parses a 0x-prefixed, 40 hex digit address in any letter case into raw bytes.
///
/// Mixed-case input is not checksum-verified here.
pub fn parse_address(address: &str) -> Result<[u8; 20], EthError> {
    let hex_str = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_str.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_str.len()
        )));
    }

    if !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Applies EIP-55 mixed-case checksum encoding to an Ethereum address.
///
/// The input may be in any letter case; all-lowercase, all-uppercase and
/// mixed-case spellings of the same address normalize to the same output.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    parse_address(address).map(|bytes| to_checksum(&bytes))
}

/// Formats raw address bytes in EIP-55 checksum form.
pub fn to_checksum(address: &[u8; 20]) -> String {
    let hex_part = hex::encode(address);

    // EIP-55: hash the lowercase hex address (without 0x).
    let hash = Keccak256::digest(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        // High nibble for even positions, low nibble for odd ones.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    #[test]
    fn eip55_checksum_known_addresses() {
        // Test vectors from EIP-55.
        let cases = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];

        for expected in &cases {
            let lower = format!("0x{}", expected[2..].to_lowercase());
            let result = checksum_address(&lower).unwrap();
            assert_eq!(&result, expected, "checksum mismatch for {}", expected);
        }
    }

    #[test]
    fn checksum_normalizes_every_letter_case() {
        let lower = "0xa411eb36538a2ae060a766221e43a94205460369";
        let upper = "0xA411EB36538A2AE060A766221E43A94205460369";
        let mixed = "0xa411Eb36538A2ae060A766221e43A94205460369";

        let expected = checksum_address(lower).unwrap();
        assert_eq!(checksum_address(upper).unwrap(), expected);
        assert_eq!(checksum_address(mixed).unwrap(), expected);
    }

    #[test]
    fn checksum_accepts_uppercase_prefix() {
        let result = checksum_address("0X5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();
        assert_eq!(result, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn checksum_is_idempotent() {
        let once = checksum_address("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
        let twice = checksum_address(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_address_stays_numeric() {
        assert_eq!(checksum_address(ZERO_ADDRESS).unwrap(), ZERO_ADDRESS);
        assert_eq!(parse_address(ZERO_ADDRESS).unwrap(), [0u8; 20]);
    }

    #[test]
    fn parse_address_roundtrips_through_checksum() {
        let addr = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";
        let bytes = parse_address(addr).unwrap();
        assert_eq!(to_checksum(&bytes), addr);
    }

    #[test]
    fn checksum_address_invalid_no_prefix() {
        let result = checksum_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert!(matches!(result, Err(EthError::InvalidAddress(_))));
    }

    #[test]
    fn checksum_address_invalid_length() {
        let result = checksum_address("0xdeadbeef");
        assert!(matches!(result, Err(EthError::InvalidAddress(_))));
    }

    #[test]
    fn checksum_address_non_hex_chars() {
        let result = checksum_address("0xGGGGb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(matches!(result, Err(EthError::InvalidAddress(_))));
    }

    #[test]
    fn pubkey_to_address_known_vector() {
        // Private key 0x0000...0001 maps to a well-known address.
        use k256::SecretKey;

        let mut privkey = [0u8; 32];
        privkey[31] = 1;

        let secret = SecretKey::from_bytes((&privkey).into()).expect("valid private key");
        let uncompressed = secret.public_key().to_encoded_point(false);

        let mut key_65 = [0u8; 65];
        key_65.copy_from_slice(uncompressed.as_bytes());

        let address = pubkey_to_eth_address(&key_65).unwrap();
        assert_eq!(address, "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
    }

    #[test]
    fn invalid_uncompressed_prefix_errors() {
        let mut key = [0u8; 65];
        key[0] = 0x03;
        assert!(pubkey_to_eth_address(&key).is_err());
    }
}
