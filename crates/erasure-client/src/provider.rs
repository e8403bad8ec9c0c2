//! The blockchain library handle: a small JSON-RPC surface the wrappers
//! delegate to, plus a blocking HTTP implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chain_eth::abi::Abi;
use chain_eth::address::checksum_address;
use chain_eth::chains::EvmChain;
use chain_eth::transaction::LegacyTransaction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};

use crate::contracts::ContractHandle;
use crate::error::ClientError;

/// Operations the contract wrappers need from a node connection.
pub trait EthClient: Send + Sync {
    /// Converts an address to its EIP-55 checksum form.
    fn to_checksum_address(&self, address: &str) -> Result<String, ClientError> {
        Ok(checksum_address(address)?)
    }

    /// Binds an interface description to the checksummed form of `address`.
    fn contract(&self, address: &str, abi: Abi) -> Result<ContractHandle, ClientError> {
        let address = self.to_checksum_address(address)?;
        Ok(ContractHandle::bind(address, abi))
    }

    fn chain_id(&self) -> Result<u64, ClientError>;

    fn gas_price(&self) -> Result<u128, ClientError>;

    /// Estimates gas for `request`. A request that would revert fails with
    /// [`ClientError::ValidationFailure`].
    fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError>;

    /// Broadcasts a signed transaction and returns the node's 0x-prefixed hash.
    fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, ClientError>;

    /// Executes a read-only call against the latest block.
    fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ClientError>;
}

/// A transaction-shaped request for `eth_call` and `eth_estimateGas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    #[serde(serialize_with = "serialize_data")]
    pub data: Vec<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_quantity"
    )]
    pub gas_price: Option<u128>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_quantity"
    )]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "is_zero", serialize_with = "serialize_quantity")]
    pub value: u128,
}

impl CallRequest {
    /// A plain read-only call with no sender.
    pub fn call(to: &str, data: Vec<u8>) -> Self {
        Self {
            to: to.to_string(),
            data,
            ..Default::default()
        }
    }

    /// Mirrors an unsigned transaction so the node can dry-run it.
    pub fn for_transaction(from: &str, tx: &LegacyTransaction) -> Self {
        Self {
            from: Some(from.to_string()),
            to: tx.to.clone(),
            data: tx.data.clone(),
            gas_price: Some(tx.gas_price),
            nonce: Some(tx.nonce),
            value: tx.value,
        }
    }
}

fn is_zero(value: &u128) -> bool {
    *value == 0
}

fn serialize_data<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(data)))
}

fn serialize_quantity<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

fn serialize_opt_quantity<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Into<u128> + Copy,
{
    match value {
        Some(value) => serialize_quantity(&(*value).into(), serializer),
        None => serializer.serialize_none(),
    }
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: String,
    /// Per-request timeout. `None` keeps the HTTP client's default.
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn for_chain(chain: &EvmChain) -> Self {
        Self::new(chain.rpc_url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Blocking JSON-RPC 2.0 client over HTTP.
///
/// Uses `reqwest::blocking`, so it must not be called from inside an async
/// runtime.
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request<P, R>(&self, method: &str, params: &P) -> Result<R, RpcFailure>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method, id, url = %self.url, "json-rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&JrpcRequest { id, method, params })
            .send()
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let parsed: JrpcResponse<R> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                RpcFailure::Transport(format!("invalid {method} response: {e}"))
            } else {
                RpcFailure::Transport(format!("{method} returned HTTP {status}"))
            }
        })?;

        match (parsed.result, parsed.error) {
            (_, Some(error)) => Err(RpcFailure::Node(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcFailure::Transport(format!(
                "{method} response has neither result nor error"
            ))),
        }
    }
}

impl EthClient for HttpProvider {
    fn chain_id(&self) -> Result<u64, ClientError> {
        let raw: String = self
            .request("eth_chainId", &NO_PARAMS)
            .map_err(|e| e.into_client_error(ClientError::NetworkFailure))?;
        let value = parse_quantity(&raw)?;
        u64::try_from(value)
            .map_err(|_| ClientError::NetworkFailure(format!("chain id {value} out of range")))
    }

    fn gas_price(&self) -> Result<u128, ClientError> {
        let raw: String = self
            .request("eth_gasPrice", &NO_PARAMS)
            .map_err(|e| e.into_client_error(ClientError::NetworkFailure))?;
        parse_quantity(&raw)
    }

    fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError> {
        let raw: String = self
            .request("eth_estimateGas", &(request,))
            .map_err(|e| e.into_client_error(ClientError::ValidationFailure))?;
        let value = parse_quantity(&raw)?;
        u64::try_from(value)
            .map_err(|_| ClientError::NetworkFailure(format!("gas estimate {value} out of range")))
    }

    fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, ClientError> {
        let encoded = format!("0x{}", hex::encode(raw_tx));
        self.request("eth_sendRawTransaction", &(encoded,))
            .map_err(|e| e.into_client_error(ClientError::ChainRejection))
    }

    fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ClientError> {
        let raw: String = self
            .request("eth_call", &(request, "latest"))
            .map_err(|e| e.into_client_error(ClientError::ChainRejection))?;
        parse_data(&raw)
    }
}

/// Parses a JSON-RPC hex quantity such as `0x4a817c800`.
pub(crate) fn parse_quantity(raw: &str) -> Result<u128, ClientError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::NetworkFailure(format!("quantity `{raw}` lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(ClientError::NetworkFailure("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ClientError::NetworkFailure(format!("invalid quantity `{raw}`: {e}")))
}

/// Parses 0x-prefixed hex data returned by the node.
pub(crate) fn parse_data(raw: &str) -> Result<Vec<u8>, ClientError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| ClientError::NetworkFailure(format!("invalid hex data: {e}")))
}

// ---------------------------------------------------------------------------
// JSON-RPC framing
// ---------------------------------------------------------------------------

/// Serializes as an empty `params` array.
const NO_PARAMS: [u8; 0] = [];

struct JrpcRequest<'a, T> {
    id: u64,
    method: &'a str,
    params: &'a T,
}

impl<T: Serialize> Serialize for JrpcRequest<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("JrpcRequest", 4)?;
        ser.serialize_field("jsonrpc", "2.0")?;
        ser.serialize_field("id", &self.id)?;
        ser.serialize_field("method", self.method)?;
        ser.serialize_field("params", self.params)?;
        ser.end()
    }
}

#[derive(Deserialize)]
struct JrpcResponse<T> {
    result: Option<T>,
    error: Option<JrpcError>,
}

#[derive(Debug, Deserialize)]
struct JrpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl std::fmt::Display for JrpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, ": {data}")?;
        }
        Ok(())
    }
}

enum RpcFailure {
    /// The node could not be reached or answered with garbage.
    Transport(String),
    /// The node answered with a JSON-RPC error object.
    Node(JrpcError),
}

impl RpcFailure {
    fn into_client_error(self, on_node_error: fn(String) -> ClientError) -> ClientError {
        match self {
            RpcFailure::Transport(msg) => ClientError::NetworkFailure(msg),
            RpcFailure::Node(error) => on_node_error(error.to_string()),
        }
    }
}
