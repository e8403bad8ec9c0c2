use alloy_rlp::{Encodable, RlpEncodable};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::address::parse_address;
use crate::error::EthError;

/// An unsigned legacy Ethereum transaction, replay-protected with EIP-155.
#[derive(Debug, Clone)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Recipient address as a 0x-prefixed hex string.
    pub to: String,
    /// Transfer value in wei.
    pub value: u128,
    pub data: Vec<u8>,
}

/// A signed transaction ready for broadcast.
pub struct SignedTransaction {
    /// RLP-encoded signed transaction bytes.
    pub raw_tx: Vec<u8>,
    /// Transaction hash as a 0x-prefixed hex string.
    pub tx_hash: String,
}

/// Builds an unsigned contract call with zero value.
///
/// The gas limit starts at zero; callers fill it in from a gas estimate.
pub fn build_contract_call(
    chain_id: u64,
    nonce: u64,
    contract: &str,
    calldata: Vec<u8>,
    gas_price: u128,
) -> Result<LegacyTransaction, EthError> {
    parse_address(contract)?;

    Ok(LegacyTransaction {
        chain_id,
        nonce,
        gas_price,
        gas_limit: 0,
        to: contract.to_string(),
        value: 0,
        data: calldata,
    })
}

/// Signs a legacy transaction with the given secp256k1 private key.
///
/// The signing process:
/// 1. RLP-encode `[nonce, gas_price, gas, to, value, data, chain_id, 0, 0]`.
/// 2. Keccak-256 hash the payload and sign the hash with k256.
/// 3. Re-encode with `v = recovery_id + 35 + 2 * chain_id`, `r` and `s`.
/// 4. Return the raw bytes and the Keccak-256 transaction hash.
pub fn sign_transaction(
    tx: &LegacyTransaction,
    private_key: &[u8; 32],
) -> Result<SignedTransaction, EthError> {
    let v = tx
        .chain_id
        .checked_mul(2)
        .and_then(|c| c.checked_add(35))
        .ok_or_else(|| {
            EthError::TransactionBuildError(format!("chain id {} too large", tx.chain_id))
        })?;

    let payload = encode_signing_payload(tx)?;
    let msg_hash = Keccak256::digest(&payload);

    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    let signing_key = signing_key?;

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(msg_hash.as_slice())
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let mut r_bytes = [0u8; 32];
    let mut s_bytes = [0u8; 32];
    r_bytes.copy_from_slice(&signature.r().to_bytes());
    s_bytes.copy_from_slice(&signature.s().to_bytes());

    let signed_fields = SignedTxFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: RlpAddress(parse_address(&tx.to)?),
        value: tx.value,
        data: RlpBytes(tx.data.clone()),
        v: v + recovery_id.is_y_odd() as u64,
        r: r_bytes.into(),
        s: s_bytes.into(),
    };

    let mut raw_tx = Vec::new();
    signed_fields.encode(&mut raw_tx);

    let tx_hash = Keccak256::digest(&raw_tx);

    Ok(SignedTransaction {
        raw_tx,
        tx_hash: format!("0x{}", hex::encode(tx_hash)),
    })
}

/// Encodes the EIP-155 signing payload:
/// `rlp([nonce, gas_price, gas, to, value, data, chain_id, 0, 0])`.
pub fn encode_signing_payload(tx: &LegacyTransaction) -> Result<Vec<u8>, EthError> {
    let fields = UnsignedTxFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: RlpAddress(parse_address(&tx.to)?),
        value: tx.value,
        data: RlpBytes(tx.data.clone()),
        chain_id: tx.chain_id,
        empty_r: 0,
        empty_s: 0,
    };

    let mut buf = Vec::new();
    fields.encode(&mut buf);
    Ok(buf)
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedTxFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable)]
struct SignedTxFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpAddress,
    value: u128,
    data: RlpBytes,
    v: u64,
    r: RlpU256,
    s: RlpU256,
}

/// Wrapper for a 20-byte Ethereum address that implements `Encodable`.
#[derive(Debug, Clone)]
struct RlpAddress([u8; 20]);

impl Encodable for RlpAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// Call data, encoded as a single RLP byte string rather than a list.
#[derive(Debug, Clone)]
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

/// Wrapper for a 256-bit integer (32 bytes) that encodes as minimal big-endian
/// bytes with leading zeros stripped (standard RLP integer encoding).
#[derive(Debug, Clone)]
struct RlpU256([u8; 32]);

impl RlpU256 {
    fn trimmed(&self) -> &[u8] {
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        &self.0[start..]
    }
}

impl From<[u8; 32]> for RlpU256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Encodable for RlpU256 {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.trimmed().encode(out);
    }

    fn length(&self) -> usize {
        self.trimmed().length()
    }
}
