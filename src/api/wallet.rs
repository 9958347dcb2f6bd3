use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    api::{error_response, ApiResult},
    blockchain::{models::ChainId, wallet_manager::ConnectionInfo},
    AppState,
};

// --- Request and Response Models ---

/// Request to connect the wallet
#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    /// Chain to switch the wallet to before connecting
    #[serde(default)]
    pub chain_id: Option<ChainId>,
}

#[derive(Debug, Serialize)]
pub struct WalletStatus {
    pub connected: bool,
    #[serde(flatten)]
    pub connection: Option<ConnectionInfo>,
}

// --- Handlers ---

/// Connect the wallet, then reload the store balances for the account.
pub async fn connect_handler(State(state): State<AppState>, Json(input): Json<ConnectRequest>) -> ApiResult<ConnectionInfo> {
    info!("Handling wallet connect request (chain {:?})", input.chain_id);
    let connection = state.wallet.connect(input.chain_id).await.map_err(error_response)?;

    let flow = state.flow.clone();
    tokio::spawn(async move {
        flow.refresh_balances().await;
    });
    Ok(Json(connection.info()))
}

pub async fn current_wallet_handler(State(state): State<AppState>) -> Json<WalletStatus> {
    let connection = state.wallet.current().await.map(|c| c.info());
    Json(WalletStatus {
        connected: connection.is_some(),
        connection,
    })
}

pub async fn disconnect_handler(State(state): State<AppState>) -> Json<WalletStatus> {
    state.wallet.disconnect().await;
    Json(WalletStatus {
        connected: false,
        connection: None,
    })
}

/// Creates a router for wallet-related endpoints
pub fn create_wallet_router() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(current_wallet_handler))
        .route("/wallet/connect", post(connect_handler))
        .route("/wallet/disconnect", post(disconnect_handler))
}
