//! # erasure-client
//!
//! A thin client for the erasure protocol `Feed` contract: it loads the
//! bundled contract interface, binds it to a deployed address and exposes
//! post creation plus a handful of read-only queries.
//!
//! Node access goes through [`EthClient`] ([`HttpProvider`] speaks JSON-RPC
//! over HTTP) and signing through [`Account`] ([`LocalAccount`] holds a
//! secp256k1 key in memory).

pub mod account;
pub mod contracts;
pub mod error;
pub mod feed;
pub mod metadata;
pub mod multihash;
pub mod provider;

pub use account::{Account, LocalAccount};
pub use contracts::{make_contract, make_contract_in, ContractHandle};
pub use error::ClientError;
pub use feed::Feed;
pub use provider::{CallRequest, EthClient, HttpProvider, ProviderConfig};
