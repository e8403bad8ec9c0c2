use std::path::PathBuf;

use chain_eth::error::EthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Contract artifact not found at {path}: {source}")]
    ResourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed contract artifact: {0}")]
    MalformedResource(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid base-58 multihash: {0}")]
    Encoding(String),

    #[error("Metadata is not serializable: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction validation failed: {0}")]
    ValidationFailure(String),

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Rejected by chain: {0}")]
    ChainRejection(String),

    #[error("Contract interface mismatch: {0}")]
    Abi(String),
}

impl From<EthError> for ClientError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidAddress(msg) => ClientError::InvalidAddress(msg),
            EthError::InvalidPrivateKey(_)
            | EthError::InvalidPublicKey(_)
            | EthError::SigningError(_) => ClientError::SigningFailure(e.to_string()),
            // Only node-supplied values (the chain id) can make a build fail.
            EthError::TransactionBuildError(_) => ClientError::NetworkFailure(e.to_string()),
            EthError::InvalidAbi(_)
            | EthError::UnsupportedType(_)
            | EthError::InvalidArguments(_)
            | EthError::DecodingError(_) => ClientError::Abi(e.to_string()),
        }
    }
}
