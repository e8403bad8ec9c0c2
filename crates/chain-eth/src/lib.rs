//! Ethereum/EVM primitives for the erasure client.
//!
//! This crate provides:
//! - EIP-55 address checksumming, parsing and derivation from secp256k1 keys
//! - JSON contract-interface (ABI) parsing plus call encoding/decoding
//! - Legacy (EIP-155) transaction building and signing
//! - EVM network presets

pub mod abi;
pub mod address;
pub mod chains;
pub mod error;
pub mod transaction;
