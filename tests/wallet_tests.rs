//! Tests for the wallet connection manager and the signer API

mod common;

use std::sync::Arc;

use ethers::types::{Address, U256};

use common::*;
use token_store_dapp::{
    blockchain::{
        models::TokenMetadata, services::token, signer::TxSettings, tx_result::TxResult, wallet_manager::WalletSession,
    },
    error::ApiError,
};

fn dai(chain_id: u64) -> TokenMetadata {
    TokenMetadata {
        config: token_config(if chain_id == 1 { DAI_MAINNET } else { DAI_ARBITRUM }, chain_id),
        symbol: "DAI".into(),
        name: "Dai Stablecoin".into(),
        decimals: 18,
    }
}

fn recipient() -> Address {
    Address::repeat_byte(0x22)
}

// --- Connection ---

#[tokio::test]
async fn connect_without_wallet_fails() {
    let session = WalletSession::new(None, registry(), TxSettings::default());
    let err = session.connect(Some(1)).await.unwrap_err();
    assert!(matches!(err, ApiError::NoWalletExtension));
    assert!(session.current().await.is_none());
}

#[tokio::test]
async fn connect_rejected_by_user() {
    let wallet = FakeWallet::new(1, &[]);
    wallet.reject_connection();
    let session = session(&wallet, registry());

    let err = session.connect(None).await.unwrap_err();
    assert!(matches!(err, ApiError::UserRejectedConnection));
    assert!(session.current().await.is_none());
}

#[tokio::test]
async fn connect_with_no_accounts_is_a_rejection() {
    let wallet = FakeWallet::new(1, &[]);
    wallet.set_accounts(vec![]);
    let session = session(&wallet, registry());

    assert!(matches!(session.connect(None).await, Err(ApiError::UserRejectedConnection)));
}

#[tokio::test]
async fn connect_uses_wallet_chain_when_none_requested() {
    let wallet = FakeWallet::new(100, &[]);
    let session = session(&wallet, registry());

    let connection = session.connect(None).await.unwrap();
    assert_eq!(connection.chain_id(), 100);
    assert_eq!(connection.signer().chain_id(), 100);
    assert_eq!(connection.address(), user());
    assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
}

#[tokio::test]
async fn connect_switches_to_requested_chain() {
    let wallet = FakeWallet::new(1, &[42161]);
    let session = session(&wallet, registry());

    let connection = session.connect(Some(42161)).await.unwrap();
    assert_eq!(connection.chain_id(), 42161);
    assert_eq!(connection.signer().chain_id(), 42161);
    assert_eq!(wallet.chain_id(), 42161);
    assert_eq!(wallet.params("wallet_switchEthereumChain")[0][0]["chainId"], "0xa4b1");
    assert_eq!(wallet.count("wallet_addEthereumChain"), 0);
}

#[tokio::test]
async fn unknown_wallet_chain_is_added_then_switched() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());

    let connection = session.connect(Some(100)).await.unwrap();
    assert_eq!(connection.chain_id(), 100);
    assert_eq!(
        wallet.methods(),
        vec![
            "eth_requestAccounts",
            "eth_chainId",
            "wallet_switchEthereumChain",
            "wallet_addEthereumChain",
            "wallet_switchEthereumChain",
            "eth_accounts",
        ]
    );

    let added = &wallet.params("wallet_addEthereumChain")[0][0];
    assert_eq!(added["chainId"], "0x64");
    assert_eq!(added["chainName"], "Gnosis");
    assert_eq!(added["rpcUrls"][0], "https://rpc.gnosischain.com");
    assert_eq!(added["nativeCurrency"]["symbol"], "xDAI");
}

#[tokio::test]
async fn unregistered_chain_is_refused_before_switching() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());

    let err = session.connect(Some(5)).await.unwrap_err();
    assert!(matches!(err, ApiError::UnknownChain(5)));
    assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
}

#[tokio::test]
async fn refused_switch_keeps_previous_connection() {
    let wallet = FakeWallet::new(1, &[100]);
    let session = session(&wallet, registry());
    let before = session.connect(None).await.unwrap();

    wallet.refuse_switch();
    let err = session.connect(Some(100)).await.unwrap_err();
    assert!(matches!(err, ApiError::ChainSwitchFailed { chain_id: 100, .. }));

    let after = session.current().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.chain_id(), 1);
}

#[tokio::test]
async fn reconnecting_to_same_chain_reuses_connection() {
    let wallet = FakeWallet::new(1, &[42161]);
    let session = session(&wallet, registry());

    let first = session.connect(Some(1)).await.unwrap();
    let second = session.connect(Some(1)).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let third = session.connect(Some(42161)).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(Arc::ptr_eq(&third, &session.current().await.unwrap()));
}

#[tokio::test]
async fn concurrent_connects_end_consistent() {
    let wallet = FakeWallet::new(1, &[42161, 100]);
    let session = session(&wallet, registry());

    let (a, b) = tokio::join!(session.connect(Some(42161)), session.connect(Some(100)));
    a.unwrap();
    b.unwrap();

    let current = session.current().await.unwrap();
    assert_eq!(current.chain_id(), wallet.chain_id());
    assert_eq!(current.signer().chain_id(), current.chain_id());
}

#[tokio::test]
async fn disconnect_forgets_connection() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());
    session.connect(None).await.unwrap();

    session.disconnect().await;
    assert!(session.current().await.is_none());
}

#[tokio::test]
async fn lease_holds_the_chain_until_dropped() {
    let wallet = FakeWallet::new(1, &[42161]);
    let session = session(&wallet, registry());
    session.connect(None).await.unwrap();

    let lease = session.lease(1).await.unwrap();
    assert_eq!(lease.signer().chain_id(), 1);

    let other = session.clone();
    let switch = tokio::spawn(async move { other.connect(Some(42161)).await });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!switch.is_finished());
    assert_eq!(wallet.chain_id(), 1);

    drop(lease);
    let connection = switch.await.unwrap().unwrap();
    assert_eq!(connection.chain_id(), 42161);
    assert_eq!(wallet.chain_id(), 42161);
}

#[tokio::test]
async fn lease_moves_wallet_to_requested_chain() {
    let wallet = FakeWallet::new(1, &[100]);
    let session = session(&wallet, registry());

    let lease = session.lease(100).await.unwrap();
    assert_eq!(lease.connection().chain_id(), 100);
    assert_eq!(wallet.chain_id(), 100);
}

// --- Signing ---

#[tokio::test]
async fn transfer_on_wrong_chain_never_reaches_wallet() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();

    let err = connection
        .signer()
        .transfer(&dai(42161), recipient(), U256::one())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ChainMismatch { signer: 1, token: 42161 }));
    assert_eq!(wallet.count("eth_sendTransaction"), 0);
}

#[tokio::test]
async fn transfer_waits_for_receipt() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();

    let result = connection
        .signer()
        .transfer(&dai(1), recipient(), U256::from(5u64))
        .await
        .unwrap();
    assert_eq!(result, TxResult::Success(()));
    assert_eq!(wallet.sent_calls(), vec![token::ERC20_TRANSFER]);
    assert!(wallet.count("eth_getTransactionReceipt") >= 1);

    let tx = &wallet.sent()[0];
    assert_eq!(tx["to"].as_str().map(str::to_lowercase), Some(DAI_MAINNET.to_lowercase()));
    assert_eq!(tx["chainId"], "0x1");
}

#[tokio::test]
async fn transfer_rejection_is_a_result_not_an_error() {
    let wallet = FakeWallet::new(1, &[]);
    wallet.reject_tx(token::ERC20_TRANSFER);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();

    let result = connection.signer().transfer(&dai(1), recipient(), U256::one()).await.unwrap();
    assert_eq!(result, TxResult::Rejected);
    assert!(wallet.sent().is_empty());
}

#[tokio::test]
async fn other_wallet_errors_propagate() {
    let wallet = FakeWallet::new(1, &[]);
    wallet.fail_tx(token::ERC20_TRANSFER, "insufficient funds for gas");
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();

    let err = connection
        .signer()
        .transfer(&dai(1), recipient(), U256::one())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Wallet(_)));
    assert!(err.to_string().contains("insufficient funds"));
}

#[tokio::test]
async fn reverted_transaction_is_an_error() {
    let wallet = FakeWallet::new(1, &[]);
    wallet.revert_tx(token::STORE_WITHDRAW);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();

    let err = connection
        .signer()
        .custody(store().address)
        .withdraw(&dai(1), U256::one())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Reverted(_)));
}

#[tokio::test]
async fn custody_operations_target_the_store() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();
    let custody = connection.signer().custody(store().address);
    let amount = U256::from(10u64);

    assert!(custody.approve(&dai(1), amount).await.unwrap().is_success());
    assert!(custody.deposit(&dai(1), amount).await.unwrap().is_success());
    assert!(custody.withdraw(&dai(1), amount).await.unwrap().is_success());

    assert_eq!(
        wallet.sent_calls(),
        vec![token::ERC20_APPROVE, token::STORE_DEPOSIT, token::STORE_WITHDRAW]
    );
    let sent = wallet.sent();
    let store_hex = format!("{:?}", store().address);
    // approve goes to the token, deposit and withdraw to the store.
    assert_eq!(sent[0]["to"].as_str().map(str::to_lowercase), Some(DAI_MAINNET.to_lowercase()));
    assert_eq!(sent[1]["to"].as_str(), Some(store_hex.as_str()));
    assert_eq!(sent[2]["to"].as_str(), Some(store_hex.as_str()));
}

#[tokio::test]
async fn custody_checks_chain_first() {
    let wallet = FakeWallet::new(1, &[]);
    let session = session(&wallet, registry());
    let connection = session.connect(None).await.unwrap();
    let custody = connection.signer().custody(store().address);

    let err = custody.approve(&dai(42161), U256::one()).await.unwrap_err();
    assert!(matches!(err, ApiError::ChainMismatch { .. }));
    assert_eq!(wallet.count("eth_sendTransaction"), 0);
}
