//! Loading bundled contract artifacts and binding them to deployed addresses.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chain_eth::abi::{Abi, Function, Token};

use crate::error::ClientError;
use crate::provider::{CallRequest, EthClient};

/// Directory, relative to this crate, holding `<ContractName>.json` artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Location of the artifacts bundled with this crate.
pub fn artifact_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(ARTIFACTS_DIR)
}

/// An interface description bound to a checksummed contract address.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    address: String,
    abi: Abi,
}

impl ContractHandle {
    /// `address` must already be checksummed; see [`EthClient::contract`].
    pub(crate) fn bind(address: String, abi: Abi) -> Self {
        Self { address, abi }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn function(&self, name: &str) -> Result<&Function, ClientError> {
        self.abi
            .function(name)
            .ok_or_else(|| ClientError::Abi(format!("contract has no function `{name}`")))
    }

    /// ABI-encodes a call to `name` with `args`.
    pub fn encode_call(&self, name: &str, args: &[Token]) -> Result<Vec<u8>, ClientError> {
        Ok(self.function(name)?.encode_input(args)?)
    }

    /// Runs `name` as a read-only call and decodes its return values.
    pub fn call<C>(&self, client: &C, name: &str, args: &[Token]) -> Result<Vec<Token>, ClientError>
    where
        C: EthClient + ?Sized,
    {
        let function = self.function(name)?;
        let data = function.encode_input(args)?;
        let output = client.call(&CallRequest::call(&self.address, data))?;
        Ok(function.decode_output(&output)?)
    }
}

/// Loads the bundled `<contract_name>.json` artifact and binds its ABI to
/// the checksummed form of `address`.
pub fn make_contract<C>(
    client: &C,
    address: &str,
    contract_name: &str,
) -> Result<ContractHandle, ClientError>
where
    C: EthClient + ?Sized,
{
    make_contract_in(client, &artifact_dir(), address, contract_name)
}

/// Like [`make_contract`], reading artifacts from `dir` instead.
pub fn make_contract_in<C>(
    client: &C,
    dir: &Path,
    address: &str,
    contract_name: &str,
) -> Result<ContractHandle, ClientError>
where
    C: EthClient + ?Sized,
{
    let path = dir.join(format!("{contract_name}.json"));

    // Names are plain identifiers, never paths.
    if contract_name.is_empty() || contract_name.contains(&['/', '\\'][..]) || contract_name == ".." {
        return Err(ClientError::ResourceNotFound {
            path,
            source: io::Error::new(io::ErrorKind::InvalidInput, "invalid contract name"),
        });
    }

    let contents = fs::read_to_string(&path)
        .map_err(|source| ClientError::ResourceNotFound { path: path.clone(), source })?;

    let artifact: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| ClientError::MalformedResource(format!("{}: {e}", path.display())))?;

    let abi_json = artifact.get("abi").ok_or_else(|| {
        ClientError::MalformedResource(format!("{} has no `abi` field", path.display()))
    })?;

    let abi = Abi::from_json(abi_json)
        .map_err(|e| ClientError::MalformedResource(format!("{}: {e}", path.display())))?;

    tracing::debug!(contract = contract_name, address, "loaded contract artifact");
    client.contract(address, abi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_eth::abi::ParamType;

    /// A client whose node operations are never reached.
    struct OfflineClient;

    impl EthClient for OfflineClient {
        fn chain_id(&self) -> Result<u64, ClientError> {
            unreachable!("artifact loading is offline")
        }
        fn gas_price(&self) -> Result<u128, ClientError> {
            unreachable!("artifact loading is offline")
        }
        fn estimate_gas(&self, _: &CallRequest) -> Result<u64, ClientError> {
            unreachable!("artifact loading is offline")
        }
        fn send_raw_transaction(&self, _: &[u8]) -> Result<String, ClientError> {
            unreachable!("artifact loading is offline")
        }
        fn call(&self, _: &CallRequest) -> Result<Vec<u8>, ClientError> {
            unreachable!("artifact loading is offline")
        }
    }

    const FEED_ADDRESS: &str = "0xA411eB36538a2Ae060A766221E43A94205460369";

    fn write_artifact(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(format!("{name}.json")), contents).unwrap();
    }

    #[test]
    fn loads_bundled_feed_artifact() {
        let contract = make_contract(&OfflineClient, FEED_ADDRESS, "Feed").unwrap();

        assert_eq!(contract.address(), FEED_ADDRESS);
        let create = contract.function("createPostExplicit").unwrap();
        assert_eq!(create.signature(), "createPostExplicit(address,bytes,bytes,bytes)");
        assert!(contract.function("getCreator").unwrap().is_read_only());
    }

    #[test]
    fn address_is_checksummed_in_any_case() {
        let lower = make_contract(&OfflineClient, &FEED_ADDRESS.to_lowercase(), "Feed").unwrap();
        let upper = make_contract(
            &OfflineClient,
            &format!("0x{}", FEED_ADDRESS[2..].to_uppercase()),
            "Feed",
        )
        .unwrap();

        assert_eq!(lower.address(), FEED_ADDRESS);
        assert_eq!(upper.address(), FEED_ADDRESS);
    }

    #[test]
    fn missing_artifact_is_resource_not_found() {
        let result = make_contract(&OfflineClient, FEED_ADDRESS, "NoSuchContract");
        match result {
            Err(ClientError::ResourceNotFound { path, source }) => {
                assert!(path.ends_with("NoSuchContract.json"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected ResourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn path_like_names_are_rejected() {
        for name in ["../Feed", "artifacts/Feed", "", ".."] {
            let result = make_contract(&OfflineClient, FEED_ADDRESS, name);
            assert!(
                matches!(result, Err(ClientError::ResourceNotFound { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_address_is_rejected() {
        let result = make_contract(&OfflineClient, "0x1234", "Feed");
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[test]
    fn unparsable_artifact_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "Broken", "{ not json");

        let result = make_contract_in(&OfflineClient, dir.path(), FEED_ADDRESS, "Broken");
        assert!(matches!(result, Err(ClientError::MalformedResource(_))));
    }

    #[test]
    fn artifact_without_abi_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "NoAbi", r#"{"contractName": "NoAbi", "bytecode": "0x"}"#);

        let result = make_contract_in(&OfflineClient, dir.path(), FEED_ADDRESS, "NoAbi");
        assert!(
            matches!(result, Err(ClientError::MalformedResource(msg)) if msg.contains("abi"))
        );
    }

    #[test]
    fn abi_of_wrong_shape_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "BadAbi", r#"{"abi": {"name": "oops"}}"#);

        let result = make_contract_in(&OfflineClient, dir.path(), FEED_ADDRESS, "BadAbi");
        assert!(matches!(result, Err(ClientError::MalformedResource(_))));
    }

    #[test]
    fn loads_custom_artifact_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(
            dir.path(),
            "Registry",
            r#"{"abi": [{"type": "function", "name": "getInstanceCount",
                "stateMutability": "view", "inputs": [],
                "outputs": [{"name": "count", "type": "uint256"}]}]}"#,
        );

        let contract =
            make_contract_in(&OfflineClient, dir.path(), FEED_ADDRESS, "Registry").unwrap();
        let function = contract.function("getInstanceCount").unwrap();
        assert_eq!(ParamType::parse(&function.outputs[0].kind).unwrap(), ParamType::Uint(256));
    }

    #[test]
    fn unknown_function_is_an_abi_error() {
        let contract = make_contract(&OfflineClient, FEED_ADDRESS, "Feed").unwrap();
        let result = contract.encode_call("transfer", &[]);
        assert!(matches!(result, Err(ClientError::Abi(_))));
    }
}
