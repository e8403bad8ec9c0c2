use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chain_eth::address::pubkey_to_eth_address;
use chain_eth::transaction::{self, LegacyTransaction, SignedTransaction};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use zeroize::Zeroizing;

use crate::error::ClientError;

/// A signing identity with its own nonce counter.
pub trait Account: Send + Sync {
    /// Checksummed sender address.
    fn address(&self) -> &str;

    /// Returns the current nonce and advances the counter in one atomic step.
    fn get_and_increment_nonce(&self) -> u64;

    fn sign_transaction(&self, tx: &LegacyTransaction) -> Result<SignedTransaction, ClientError>;
}

/// An account backed by an in-memory secp256k1 key.
///
/// The key bytes are zeroized on drop. The nonce is tracked locally; callers
/// seed it from `eth_getTransactionCount` (or a previous session) through
/// [`LocalAccount::with_nonce`] / [`LocalAccount::set_nonce`].
pub struct LocalAccount {
    address: String,
    private_key: Zeroizing<[u8; 32]>,
    nonce: AtomicU64,
}

impl LocalAccount {
    pub fn from_private_key(private_key: &[u8; 32]) -> Result<Self, ClientError> {
        let secret = SecretKey::from_bytes(private_key.into())
            .map_err(|e| ClientError::SigningFailure(format!("invalid private key: {e}")))?;

        let uncompressed = secret.public_key().to_encoded_point(false);
        let mut key_65 = [0u8; 65];
        key_65.copy_from_slice(uncompressed.as_bytes());

        Ok(Self {
            address: pubkey_to_eth_address(&key_65)?,
            private_key: Zeroizing::new(*private_key),
            nonce: AtomicU64::new(0),
        })
    }

    /// Parses a 64 hex digit private key, with or without a 0x prefix.
    pub fn from_hex(private_key: &str) -> Result<Self, ClientError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = Zeroizing::new(
            hex::decode(digits)
                .map_err(|e| ClientError::SigningFailure(format!("invalid private key hex: {e}")))?,
        );
        let key: Zeroizing<[u8; 32]> =
            Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
                ClientError::SigningFailure(format!(
                    "private key must be 32 bytes, got {}",
                    bytes.len()
                ))
            })?);
        Self::from_private_key(&key)
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.set_nonce(nonce);
        self
    }

    /// The nonce the next transaction will use.
    pub fn nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }
}

impl Account for LocalAccount {
    fn address(&self) -> &str {
        &self.address
    }

    fn get_and_increment_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    fn sign_transaction(&self, tx: &LegacyTransaction) -> Result<SignedTransaction, ClientError> {
        Ok(transaction::sign_transaction(tx, &self.private_key)?)
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .field("nonce", &self.nonce())
            .finish_non_exhaustive()
    }
}
