use std::sync::Arc;

use chain_eth::abi::Token;
use chain_eth::address::{parse_address, to_checksum, ZERO_ADDRESS};
use chain_eth::transaction::build_contract_call;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::contracts::{make_contract, ContractHandle};
use crate::error::ClientError;
use crate::metadata::encode_metadata;
use crate::multihash::decode_multihash;
use crate::provider::{CallRequest, EthClient};

/// Artifact name of the feed contract.
pub const FEED_CONTRACT: &str = "Feed";

const CREATE_POST: &str = "createPostExplicit";
const GET_CREATOR: &str = "getCreator";
const GET_OPERATOR: &str = "getOperator";
const HAS_ACTIVE_OPERATOR: &str = "hasActiveOperator";

/// Client-side proxy for one deployed erasure Feed contract.
///
/// The node client and the account are shared with the caller; the feed only
/// invokes operations on them. The account's nonce counter advances on every
/// [`Feed::create_post`] that gets past argument encoding, even if the
/// transaction is later rejected.
pub struct Feed {
    client: Arc<dyn EthClient>,
    account: Arc<dyn Account>,
    contract: ContractHandle,
}

impl Feed {
    pub fn new(
        client: Arc<dyn EthClient>,
        account: Arc<dyn Account>,
        address: &str,
    ) -> Result<Self, ClientError> {
        let contract = make_contract(client.as_ref(), address, FEED_CONTRACT)?;
        Ok(Self {
            client,
            account,
            contract,
        })
    }

    /// Checksummed address of the feed contract.
    pub fn address(&self) -> &str {
        self.contract.address()
    }

    pub fn contract(&self) -> &ContractHandle {
        &self.contract
    }

    /// Publishes a post with the given base-58 proof multihash and JSON
    /// metadata, returning the 0x-prefixed transaction hash reported by the
    /// node.
    ///
    /// The post has no operator and empty variable metadata.
    pub fn create_post<M>(&self, multihash: &str, metadata: &M) -> Result<String, ClientError>
    where
        M: Serialize + ?Sized,
    {
        let proof_hash = decode_multihash(multihash)?;
        let static_metadata = encode_metadata(metadata)?;

        let calldata = self.contract.encode_call(
            CREATE_POST,
            &[
                Token::Address(parse_address(ZERO_ADDRESS)?),
                Token::Bytes(proof_hash),
                Token::Bytes(static_metadata),
                Token::Bytes(Vec::new()),
            ],
        )?;

        let from = self.account.address();
        let chain_id = self.client.chain_id()?;
        let gas_price = self.client.gas_price()?;
        let nonce = self.account.get_and_increment_nonce();
        debug!(feed = self.address(), from, chain_id, gas_price, nonce, "built post transaction");

        let mut tx = build_contract_call(chain_id, nonce, self.address(), calldata, gas_price)?;

        // A reverting call fails here, before anything is signed or sent.
        tx.gas_limit = self
            .client
            .estimate_gas(&CallRequest::for_transaction(from, &tx))
            .inspect_err(|e| warn!(nonce, "post failed validation, nonce not reused: {e}"))?;

        let signed = self.account.sign_transaction(&tx)?;
        let tx_hash = self
            .client
            .send_raw_transaction(&signed.raw_tx)
            .inspect_err(|e| warn!(nonce, "post was not accepted, nonce not reused: {e}"))?;

        if !tx_hash.eq_ignore_ascii_case(&signed.tx_hash) {
            warn!(local = %signed.tx_hash, node = %tx_hash, "node reported a different transaction hash");
        }
        info!(feed = self.address(), %tx_hash, nonce, gas = tx.gas_limit, "submitted post");

        Ok(tx_hash)
    }

    /// Address that created the feed.
    pub fn get_creator(&self) -> Result<String, ClientError> {
        self.read_address(GET_CREATOR)
    }

    /// Address currently allowed to operate the feed.
    pub fn get_operator(&self) -> Result<String, ClientError> {
        self.read_address(GET_OPERATOR)
    }

    pub fn has_active_operator(&self) -> Result<bool, ClientError> {
        self.read_single(HAS_ACTIVE_OPERATOR)?
            .into_bool()
            .ok_or_else(|| ClientError::Abi(format!("{HAS_ACTIVE_OPERATOR} did not return a bool")))
    }

    fn read_address(&self, function: &str) -> Result<String, ClientError> {
        self.read_single(function)?
            .into_address()
            .map(|addr| to_checksum(&addr))
            .ok_or_else(|| ClientError::Abi(format!("{function} did not return an address")))
    }

    fn read_single(&self, function: &str) -> Result<Token, ClientError> {
        self.contract
            .call(self.client.as_ref(), function, &[])?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Abi(format!("{function} returned nothing")))
    }
}
