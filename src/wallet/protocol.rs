// src/wallet/protocol.rs
//
// JSON-RPC envelope spoken with the wallet, plus the EIP-1193 / EIP-3085
// error codes the dapp reacts to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl Request {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id: Value::from(id),
            method: method.to_string(),
            params,
        }
    }
}

impl Response {
    /// Splits the envelope into its payload. A `null` result is a valid
    /// success (e.g. `wallet_switchEthereumChain`, or a pending receipt).
    pub fn into_result(self) -> Result<Value, ErrorObject> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

pub mod error_codes {
    // EIP-1193: the user declined the request
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    // Returned by wallet_switchEthereumChain for chains the wallet does not know
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    // Standard JSON-RPC error codes
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
