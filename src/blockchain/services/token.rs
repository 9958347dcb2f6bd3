// src/blockchain/services/token.rs
//
// Calldata encoding and return-data decoding for the ERC20 and custody
// contract calls the dapp makes.

use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_core::utils::keccak256;
use std::str::FromStr;

use crate::error::{ApiError, Result};

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

pub fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    let mut tail = encode(&tokens);
    out.append(&mut tail);
    Bytes::from(out)
}

/// True when `data` is a call to the function with signature `sig`.
pub fn is_call_to(data: &[u8], sig: &str) -> bool {
    data.len() >= 4 && data[..4] == selector(sig)
}

pub fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim()).map_err(|e| ApiError::InvalidInput(format!("bad address '{}': {}", s, e)))
}

// --- ERC20 reads ---

pub fn symbol_call() -> Bytes {
    encode_call("symbol()", vec![])
}

pub fn name_call() -> Bytes {
    encode_call("name()", vec![])
}

pub fn decimals_call() -> Bytes {
    encode_call("decimals()", vec![])
}

pub fn total_supply_call() -> Bytes {
    encode_call("totalSupply()", vec![])
}

pub fn balance_of_call(owner: Address) -> Bytes {
    encode_call("balanceOf(address)", vec![Token::Address(owner)])
}

// --- ERC20 writes ---

pub fn erc20_transfer_tx(token: Address, to: Address, amount: U256) -> TransactionRequest {
    let data = encode_call(ERC20_TRANSFER, vec![Token::Address(to), Token::Uint(amount)]);
    TransactionRequest::new().to(token).data(data)
}

pub fn erc20_approve_tx(token: Address, spender: Address, amount: U256) -> TransactionRequest {
    let data = encode_call(ERC20_APPROVE, vec![Token::Address(spender), Token::Uint(amount)]);
    TransactionRequest::new().to(token).data(data)
}

// --- Custody contract ---

pub const STORE_DEPOSIT: &str = "deposit(address,uint256)";
pub const STORE_WITHDRAW: &str = "withdraw(address,uint256)";
pub const STORE_GET_BALANCES: &str = "getBalances()";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";
pub const ERC20_TRANSFER: &str = "transfer(address,uint256)";

pub fn store_deposit_tx(store: Address, token: Address, amount: U256) -> TransactionRequest {
    let data = encode_call(STORE_DEPOSIT, vec![Token::Address(token), Token::Uint(amount)]);
    TransactionRequest::new().to(store).data(data)
}

pub fn store_withdraw_tx(store: Address, token: Address, amount: U256) -> TransactionRequest {
    let data = encode_call(STORE_WITHDRAW, vec![Token::Address(token), Token::Uint(amount)]);
    TransactionRequest::new().to(store).data(data)
}

pub fn store_get_balances_call() -> Bytes {
    encode_call(STORE_GET_BALANCES, vec![])
}

// --- Decoding ---

pub fn decode_string(bytes: &[u8]) -> Result<String> {
    // Try standard ABI string
    if let Ok(tokens) = decode(&[ParamType::String], bytes) {
        if let Some(Token::String(s)) = tokens.into_iter().next() {
            return Ok(s);
        }
    }
    // Fallback: bytes32 to string (strip zeros), as used by some older tokens
    if let Ok(tokens) = decode(&[ParamType::FixedBytes(32)], bytes) {
        if let Some(Token::FixedBytes(b)) = tokens.into_iter().next() {
            let raw: Vec<u8> = b.into_iter().take_while(|c| *c != 0u8).collect();
            if let Ok(s) = String::from_utf8(raw) {
                return Ok(s);
            }
        }
    }
    Err(ApiError::InvalidResponse(format!(
        "expected an ABI string, got 0x{}",
        hex::encode(bytes)
    )))
}

pub fn decode_u256(bytes: &[u8]) -> Result<U256> {
    match decode(&[ParamType::Uint(256)], bytes) {
        Ok(tokens) => match tokens.into_iter().next() {
            Some(Token::Uint(n)) => Ok(n),
            other => Err(ApiError::InvalidResponse(format!("expected uint256, got {:?}", other))),
        },
        Err(e) => Err(ApiError::InvalidResponse(format!("expected uint256: {}", e))),
    }
}

pub fn decode_decimals(bytes: &[u8]) -> Result<u8> {
    let n = decode_u256(bytes)?;
    if n > U256::from(u8::MAX) {
        return Err(ApiError::InvalidResponse(format!("decimals out of range: {}", n)));
    }
    Ok(n.as_u32() as u8)
}

/// Decodes `(address erc20Token, uint256 balance)[]`.
pub fn decode_store_balances(bytes: &[u8]) -> Result<Vec<(Address, U256)>> {
    let row = ParamType::Tuple(vec![ParamType::Address, ParamType::Uint(256)]);
    let tokens = decode(&[ParamType::Array(Box::new(row))], bytes)
        .map_err(|e| ApiError::InvalidResponse(format!("bad getBalances() result: {}", e)))?;

    let rows = match tokens.into_iter().next() {
        Some(Token::Array(rows)) => rows,
        other => return Err(ApiError::InvalidResponse(format!("expected array, got {:?}", other))),
    };

    rows.into_iter()
        .map(|row| match row {
            Token::Tuple(fields) => match fields.as_slice() {
                [Token::Address(a), Token::Uint(b)] => Ok((*a, *b)),
                _ => Err(ApiError::InvalidResponse(format!("bad balance row: {:?}", fields))),
            },
            other => Err(ApiError::InvalidResponse(format!("bad balance row: {:?}", other))),
        })
        .collect()
}
