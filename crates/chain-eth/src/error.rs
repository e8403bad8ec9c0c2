use thiserror::Error;

/// Ethereum chain operation errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid abi: {0}")]
    InvalidAbi(String),

    #[error("unsupported abi type: {0}")]
    UnsupportedType(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_private_key() {
        let err = EthError::InvalidPrivateKey("key too short".into());
        assert_eq!(err.to_string(), "invalid private key: key too short");
    }

    #[test]
    fn display_invalid_address() {
        let err = EthError::InvalidAddress("bad checksum".into());
        assert_eq!(err.to_string(), "invalid address: bad checksum");
    }

    #[test]
    fn display_invalid_abi() {
        let err = EthError::InvalidAbi("expected an array".into());
        assert_eq!(err.to_string(), "invalid abi: expected an array");
    }

    #[test]
    fn display_unsupported_type() {
        let err = EthError::UnsupportedType("uint256[]".into());
        assert_eq!(err.to_string(), "unsupported abi type: uint256[]");
    }

    #[test]
    fn display_invalid_arguments() {
        let err = EthError::InvalidArguments("expected 4 arguments, got 3".into());
        assert_eq!(err.to_string(), "invalid arguments: expected 4 arguments, got 3");
    }

    #[test]
    fn display_decoding_error() {
        let err = EthError::DecodingError("output too short".into());
        assert_eq!(err.to_string(), "decoding error: output too short");
    }

    #[test]
    fn display_signing_error() {
        let err = EthError::SigningError("invalid signature".into());
        assert_eq!(err.to_string(), "signing error: invalid signature");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(EthError::InvalidPrivateKey("test".into()));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn debug_format_works() {
        let err = EthError::TransactionBuildError("chain id overflow".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("TransactionBuildError"));
    }
}
