//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    abi::{encode, Token},
    providers::{JsonRpcClient, JsonRpcError, MockProvider, Provider, ProviderError, RpcError},
    types::{Address, Bytes, H256, U256},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;

use token_store_dapp::{
    blockchain::{
        models::{ChainId, StoreDeployment, TokenConfig},
        provider_api::ProviderApi,
        provider_pool::ProviderPool,
        registry::{arbitrum, gnosis, mainnet, ChainRegistry},
        services::token,
        signer::TxSettings,
        wallet_manager::WalletSession,
    },
    error::ApiError,
    wallet::{protocol::error_codes, Eip1193Provider, WalletError},
};

pub const DAI_MAINNET: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const DAI_ARBITRUM: &str = "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1";
pub const GNOSIS_TOKEN: &str = "0x44fA8E6f47987339850636F88629646662444217";

pub fn user() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn store() -> StoreDeployment {
    StoreDeployment {
        chain_id: 1,
        address: Address::repeat_byte(0x5e),
    }
}

pub fn registry() -> Arc<ChainRegistry> {
    Arc::new(ChainRegistry::new(vec![
        mainnet("http://localhost:8545"),
        arbitrum("http://localhost:8546"),
        gnosis("http://localhost:8547"),
    ]))
}

pub fn fast_settings() -> TxSettings {
    TxSettings {
        poll_interval: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
    }
}

// --- Network reads ---

/// One scripted `MockProvider` per chain id.
pub struct MockChains {
    pub mocks: HashMap<ChainId, MockProvider>,
}

impl MockChains {
    pub fn new(chain_ids: &[ChainId]) -> Self {
        Self {
            mocks: chain_ids.iter().map(|id| (*id, MockProvider::new())).collect(),
        }
    }

    pub fn chain(&self, chain_id: ChainId) -> &MockProvider {
        &self.mocks[&chain_id]
    }

    pub fn pool(&self, registry: Arc<ChainRegistry>) -> ProviderPool<MockProvider> {
        let mocks = self.mocks.clone();
        ProviderPool::with_connector(registry, move |chain| {
            mocks
                .get(&chain.chain_id)
                .cloned()
                .map(Provider::new)
                .ok_or_else(|| ApiError::network(chain.chain_id, "no mock for chain"))
        })
    }

    pub fn api(&self, registry: Arc<ChainRegistry>) -> Arc<ProviderApi<MockProvider>> {
        Arc::new(ProviderApi::with_pool(self.pool(registry)))
    }
}

pub fn abi_string(value: &str) -> Bytes {
    Bytes::from(encode(&[Token::String(value.to_string())]))
}

pub fn abi_uint(value: impl Into<U256>) -> Bytes {
    Bytes::from(encode(&[Token::Uint(value.into())]))
}

pub fn abi_store_balances(rows: &[(Address, U256)]) -> Bytes {
    let rows = rows
        .iter()
        .map(|(token, balance)| Token::Tuple(vec![Token::Address(*token), Token::Uint(*balance)]))
        .collect();
    Bytes::from(encode(&[Token::Array(rows)]))
}

/// Queue `eth_call` results so they are returned in the given order.
/// `MockProvider` answers the most recently pushed response first.
pub fn queue_calls(mock: &MockProvider, responses: Vec<Bytes>) {
    for response in responses.into_iter().rev() {
        mock.push::<Bytes, _>(response).unwrap();
    }
}

/// The three reads behind a metadata lookup: symbol, name, decimals.
pub fn metadata_responses(symbol: &str, name: &str, decimals: u8) -> Vec<Bytes> {
    vec![abi_string(symbol), abi_string(name), abi_uint(decimals)]
}

pub fn token_config(address: &str, chain_id: ChainId) -> TokenConfig {
    TokenConfig::new(address, chain_id)
}

// --- Wallet ---

#[derive(Default)]
struct FakeState {
    chain_id: ChainId,
    known_chains: HashSet<ChainId>,
    accounts: Vec<Address>,
    reject_connection: bool,
    refuse_switch: bool,
    rejected: Vec<&'static str>,
    failing: Vec<(&'static str, String)>,
    reverting: Vec<&'static str>,
    requests: Vec<(String, Value)>,
    sent: Vec<Value>,
    receipts: HashMap<H256, u64>,
}

/// An in-memory EIP-1193 wallet. Transactions are mined as soon as they are
/// sent unless told otherwise.
#[derive(Default)]
pub struct FakeWallet {
    state: Mutex<FakeState>,
}

impl FakeWallet {
    /// A wallet on `chain_id` that knows every chain in `known`.
    pub fn new(chain_id: ChainId, known: &[ChainId]) -> Arc<Self> {
        let wallet = FakeWallet::default();
        {
            let mut state = wallet.state.lock().unwrap();
            state.chain_id = chain_id;
            state.known_chains = known.iter().copied().collect();
            state.known_chains.insert(chain_id);
            state.accounts = vec![user()];
        }
        Arc::new(wallet)
    }

    pub fn chain_id(&self) -> ChainId {
        self.state.lock().unwrap().chain_id
    }

    pub fn set_chain(&self, chain_id: ChainId) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    pub fn reject_connection(&self) {
        self.state.lock().unwrap().reject_connection = true;
    }

    /// The user declines every chain switch.
    pub fn refuse_switch(&self) {
        self.state.lock().unwrap().refuse_switch = true;
    }

    /// The user declines every transaction calling `signature`.
    pub fn reject_tx(&self, signature: &'static str) {
        self.state.lock().unwrap().rejected.push(signature);
    }

    /// Transactions calling `signature` fail before being sent.
    pub fn fail_tx(&self, signature: &'static str, message: &str) {
        self.state.lock().unwrap().failing.push((signature, message.to_string()));
    }

    /// Transactions calling `signature` are mined with status 0.
    pub fn revert_tx(&self, signature: &'static str) {
        self.state.lock().unwrap().reverting.push(signature);
    }

    pub fn methods(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state.lock().unwrap().requests.iter().filter(|(m, _)| m == method).count()
    }

    pub fn params(&self, method: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Signatures of the transactions the wallet accepted and sent, in order.
    pub fn sent_calls(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter_map(|tx| signature_of(&tx_data(tx)))
            .collect()
    }

    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }
}

const KNOWN_SIGNATURES: [&str; 4] = [
    token::ERC20_APPROVE,
    token::ERC20_TRANSFER,
    token::STORE_DEPOSIT,
    token::STORE_WITHDRAW,
];

fn tx_data(tx: &Value) -> Vec<u8> {
    let data = tx
        .get("data")
        .or_else(|| tx.get("input"))
        .and_then(Value::as_str)
        .unwrap_or("0x");
    hex::decode(data.trim_start_matches("0x")).unwrap_or_default()
}

fn signature_of(data: &[u8]) -> Option<&'static str> {
    KNOWN_SIGNATURES.into_iter().find(|sig| token::is_call_to(data, sig))
}

const METHOD_NOT_FOUND: i64 = -32601;

fn rpc_error(code: i64, message: &str) -> WalletError {
    WalletError::Rpc {
        code,
        message: message.to_string(),
    }
}

fn parse_hex_chain(value: &Value) -> ChainId {
    let text = value["chainId"].as_str().unwrap_or("0x0");
    u64::from_str_radix(text.trim_start_matches("0x"), 16).unwrap_or_default()
}

#[async_trait]
impl Eip1193Provider for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((method.to_string(), params.clone()));

        match method {
            "eth_requestAccounts" => {
                if state.reject_connection {
                    return Err(rpc_error(error_codes::USER_REJECTED_REQUEST, "User rejected the request."));
                }
                Ok(json!(state.accounts))
            }
            "eth_accounts" => Ok(json!(state.accounts)),
            "eth_chainId" => Ok(json!(format!("0x{:x}", state.chain_id))),
            "wallet_switchEthereumChain" => {
                if state.refuse_switch {
                    return Err(rpc_error(error_codes::USER_REJECTED_REQUEST, "User rejected the request."));
                }
                let chain_id = parse_hex_chain(&params[0]);
                if !state.known_chains.contains(&chain_id) {
                    return Err(rpc_error(error_codes::UNRECOGNIZED_CHAIN, "Unrecognized chain ID"));
                }
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = parse_hex_chain(&params[0]);
                state.known_chains.insert(chain_id);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                let tx = params[0].clone();
                let chain_id = parse_hex_chain(&tx);
                if chain_id != state.chain_id {
                    return Err(rpc_error(error_codes::INTERNAL_ERROR, "chain id mismatch"));
                }
                let signature = signature_of(&tx_data(&tx));
                if let Some(sig) = signature {
                    if state.rejected.contains(&sig) {
                        return Err(rpc_error(error_codes::USER_REJECTED_REQUEST, "User denied transaction signature."));
                    }
                    if let Some((_, message)) = state.failing.iter().find(|(s, _)| *s == sig) {
                        return Err(rpc_error(error_codes::INTERNAL_ERROR, message));
                    }
                }
                let status = match signature {
                    Some(sig) if state.reverting.contains(&sig) => 0,
                    _ => 1,
                };
                let hash = H256::from_low_u64_be(state.sent.len() as u64 + 1);
                state.sent.push(tx);
                state.receipts.insert(hash, status);
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash: H256 = serde_json::from_value(params[0].clone())
                    .map_err(|e| rpc_error(error_codes::INVALID_PARAMS, &e.to_string()))?;
                Ok(match state.receipts.get(&hash) {
                    Some(status) => json!({ "transactionHash": hash, "status": format!("0x{:x}", status) }),
                    None => Value::Null,
                })
            }
            _ => Err(rpc_error(METHOD_NOT_FOUND, "method not supported")),
        }
    }
}

pub fn session(wallet: &Arc<FakeWallet>, registry: Arc<ChainRegistry>) -> Arc<WalletSession> {
    Arc::new(WalletSession::new(
        Some(wallet.clone() as Arc<dyn Eip1193Provider>),
        registry,
        fast_settings(),
    ))
}

// --- Scripted chain ---

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("no scripted answer for {0}")]
    Unscripted(String),
}

impl RpcError for ScriptError {
    fn as_error_response(&self) -> Option<&JsonRpcError> {
        None
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            ScriptError::Serde(e) => Some(e),
            ScriptError::Unscripted(_) => None,
        }
    }
}

impl From<ScriptError> for ProviderError {
    fn from(e: ScriptError) -> Self {
        ProviderError::JsonRpcClientError(Box::new(e))
    }
}

#[derive(Debug)]
struct ScriptState {
    calls: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    balances: Mutex<HashMap<Address, U256>>,
    log: Mutex<Vec<(Address, [u8; 4])>>,
    paused: watch::Sender<bool>,
}

/// A chain whose reads are answered from a fixed script, independent of the
/// order in which they arrive. Reads can be held back with [`ScriptedChain::pause`].
#[derive(Debug, Clone)]
pub struct ScriptedChain {
    state: Arc<ScriptState>,
}

impl Default for ScriptedChain {
    fn default() -> Self {
        Self::new()
    }
}

fn selector_of(signature: &str) -> [u8; 4] {
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&ethers::utils::keccak256(signature.as_bytes())[..4]);
    selector
}

impl ScriptedChain {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Arc::new(ScriptState {
                calls: Mutex::new(HashMap::new()),
                balances: Mutex::new(HashMap::new()),
                log: Mutex::new(Vec::new()),
                paused,
            }),
        }
    }

    /// Answer calls to `signature` on `to` with `result`.
    pub fn on_call(&self, to: Address, signature: &str, result: Bytes) {
        self.state.calls.lock().unwrap().insert((to, selector_of(signature)), result);
    }

    pub fn token(&self, address: &str, symbol: &str, name: &str, decimals: u8) {
        let address: Address = address.parse().unwrap();
        self.on_call(address, "symbol()", abi_string(symbol));
        self.on_call(address, "name()", abi_string(name));
        self.on_call(address, "decimals()", abi_uint(decimals));
    }

    pub fn store_balances(&self, store: Address, rows: &[(Address, U256)]) {
        self.on_call(store, token::STORE_GET_BALANCES, abi_store_balances(rows));
    }

    pub fn native_balance(&self, owner: Address, amount: U256) {
        self.state.balances.lock().unwrap().insert(owner, amount);
    }

    /// Number of `eth_call`s made to `signature`.
    pub fn calls(&self, signature: &str) -> usize {
        let selector = selector_of(signature);
        self.state.log.lock().unwrap().iter().filter(|(_, s)| *s == selector).count()
    }

    /// Hold every read until [`ScriptedChain::resume`].
    pub fn pause(&self) {
        self.state.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.state.paused.send_replace(false);
    }

    fn answer(&self, method: &str, params: &Value) -> Result<Value, ScriptError> {
        match method {
            "eth_getBalance" => {
                let owner: Address = serde_json::from_value(params[0].clone())?;
                let balance = self.state.balances.lock().unwrap().get(&owner).copied().unwrap_or_default();
                Ok(json!(balance))
            }
            "eth_call" => {
                let tx = &params[0];
                let to: Address = serde_json::from_value(tx["to"].clone())?;
                let data = tx_data(tx);
                if data.len() < 4 {
                    return Err(ScriptError::Unscripted(format!("call to {:?} without selector", to)));
                }
                let mut selector = [0u8; 4];
                selector.copy_from_slice(&data[..4]);
                self.state.log.lock().unwrap().push((to, selector));
                self.state
                    .calls
                    .lock()
                    .unwrap()
                    .get(&(to, selector))
                    .map(|bytes| json!(bytes))
                    .ok_or_else(|| ScriptError::Unscripted(format!("call 0x{} on {:?}", hex::encode(selector), to)))
            }
            other => Err(ScriptError::Unscripted(other.to_string())),
        }
    }
}

#[async_trait]
impl JsonRpcClient for ScriptedChain {
    type Error = ScriptError;

    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, Self::Error>
    where
        T: std::fmt::Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let params = serde_json::to_value(params)?;
        let mut paused = self.state.paused.subscribe();
        // The sender lives as long as `self`, so this only ends once resumed.
        let _ = paused.wait_for(|paused| !*paused).await;
        let value = self.answer(method, &params)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Read-only access backed by one scripted chain per chain id.
pub fn scripted_api(registry: Arc<ChainRegistry>, chains: &[(ChainId, ScriptedChain)]) -> Arc<ProviderApi<ScriptedChain>> {
    let chains: HashMap<ChainId, ScriptedChain> = chains.iter().cloned().collect();
    Arc::new(ProviderApi::with_pool(ProviderPool::with_connector(registry, move |chain| {
        chains
            .get(&chain.chain_id)
            .cloned()
            .map(Provider::new)
            .ok_or_else(|| ApiError::network(chain.chain_id, "chain is not scripted"))
    })))
}
