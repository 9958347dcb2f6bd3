//! Text fields that convert user input into typed values.

use ethers::types::{Address, U256};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, Result};

lazy_static! {
    static ref ETH_ADDRESS_RE: Regex = Regex::new(r"^\s*(0x[0-9a-fA-F]{40})\s*$").unwrap();
    static ref TOKEN_AMOUNT_RE: Regex = Regex::new(r"^([0-9]*[.])?[0-9]+$").unwrap();
}

/// Conversion between an editable text value and a typed value.
pub trait FieldFns<T> {
    fn to_text(&self, value: &T) -> String;

    /// `None` when `text` is acceptable, otherwise a message for the user.
    fn validate(&self, text: &str) -> Option<String>;

    /// Only meaningful for text that passed [`FieldFns::validate`].
    fn from_text(&self, text: &str) -> Result<T>;

    fn equals(&self, a: &T, b: &T) -> bool;
}

/// A `0x` prefixed hex address. Surrounding whitespace is ignored and the
/// address text is kept exactly as typed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthAddressField;

impl FieldFns<String> for EthAddressField {
    fn to_text(&self, value: &String) -> String {
        value.clone()
    }

    fn validate(&self, text: &str) -> Option<String> {
        if ETH_ADDRESS_RE.is_match(text) {
            None
        } else {
            Some("expected an eth hex address".to_string())
        }
    }

    fn from_text(&self, text: &str) -> Result<String> {
        ETH_ADDRESS_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ApiError::InvalidInput(format!("expected an eth hex address, got {:?}", text)))
    }

    fn equals(&self, a: &String, b: &String) -> bool {
        a == b
    }
}

impl EthAddressField {
    pub fn parse(&self, text: &str) -> Result<Address> {
        let address = self.from_text(text)?;
        address
            .parse()
            .map_err(|e| ApiError::InvalidInput(format!("invalid address {}: {}", address, e)))
    }
}

/// A token amount written in whole units with up to `decimals` digits after
/// the point, held as an integer in the token's smallest unit.
#[derive(Debug, Clone, Copy)]
pub struct TokenAmountField {
    pub decimals: u8,
}

impl TokenAmountField {
    pub fn new(decimals: u8) -> Self {
        Self { decimals }
    }

    fn parse(&self, text: &str) -> std::result::Result<U256, String> {
        if !TOKEN_AMOUNT_RE.is_match(text) {
            return Err("must be a number".to_string());
        }
        let (int, frac) = text.split_once('.').unwrap_or((text, ""));
        let decimals = usize::from(self.decimals);
        if frac.len() > decimals {
            return Err(format!("at most {} decimal places", decimals));
        }

        let digits = format!("{}{}{}", int, frac, "0".repeat(decimals - frac.len()));
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_dec_str(digits).map_err(|_| "amount is too large".to_string())
    }
}

impl FieldFns<U256> for TokenAmountField {
    fn to_text(&self, value: &U256) -> String {
        let decimals = usize::from(self.decimals);
        let digits = value.to_string();
        if decimals == 0 {
            return digits;
        }

        let digits = format!("{:0>width$}", digits, width = decimals + 1);
        let (int, frac) = digits.split_at(digits.len() - decimals);
        let frac = frac.trim_end_matches('0');
        format!("{}.{}", int, if frac.is_empty() { "0" } else { frac })
    }

    fn validate(&self, text: &str) -> Option<String> {
        self.parse(text).err()
    }

    fn from_text(&self, text: &str) -> Result<U256> {
        self.parse(text)
            .map_err(|reason| ApiError::InvalidInput(format!("invalid amount {:?}: {}", text, reason)))
    }

    fn equals(&self, a: &U256, b: &U256) -> bool {
        a == b
    }
}

/// Whether a withdrawal of `text` may be submitted against `balance`.
pub fn withdrawal_submittable(text: &str, decimals: u8, balance: U256) -> bool {
    TokenAmountField::new(decimals)
        .parse(text)
        .map(|amount| amount <= balance)
        .unwrap_or(false)
}
