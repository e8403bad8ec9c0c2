//! Helpers for base-58 encoded IPFS multihashes.

use crate::error::ClientError;

/// Decodes a base-58 multihash (e.g. an IPFS `Qm…` hash) into raw bytes.
pub fn decode_multihash(multihash: &str) -> Result<Vec<u8>, ClientError> {
    bs58::decode(multihash)
        .into_vec()
        .map_err(|e| ClientError::Encoding(e.to_string()))
}

/// Returns the 0x-prefixed hex form of a base-58 multihash, as stored on chain.
pub fn multihash_to_hex(multihash: &str) -> Result<String, ClientError> {
    decode_multihash(multihash).map(|bytes| format!("0x{}", hex::encode(bytes)))
}
