//! EIP-1193 wallet boundary.

pub mod eip1193;
pub mod protocol;

pub use eip1193::{Eip1193Provider, HttpWallet, WalletError};
