//! # API Module
//!
//! HTTP handlers for the token store dapp. Every route lives under `/api`
//! and speaks JSON.
//!
//! ## Available Endpoints
//!
//! ### Chains and balances
//! - `GET /health` - Liveness check
//! - `GET /chains` - Configured networks
//! - `GET /balances/:address` - Native and token balances on every network
//!
//! ### Wallet
//! - `POST /wallet/connect` - Connect, optionally switching to `chain_id`
//! - `GET /wallet` - Current connection
//! - `POST /wallet/disconnect` - Forget the connection
//!
//! ### Deposit/withdraw flow
//! - `GET /flow` - Current state and store balances
//! - `POST /flow` - Apply a flow command
//! - `POST /flow/refresh` - Reload store balances
//!
//! ### Send flow
//! - `POST /send/start` - Start sending a token
//! - `POST /send/next` - Submit destination and amount
//! - `POST /send/cancel` - Abandon the flow
//! - `GET /send` - Current status

pub mod balance;
pub mod chains;
pub mod flow;
pub mod health;
pub mod send;
pub mod wallet;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::error;

use crate::{error::ApiError, AppState};

/// Handler result: JSON on success, status and message on failure.
pub type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Map an error to the status code the client sees.
pub fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::UnknownChain(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
        ApiError::UserRejectedConnection => StatusCode::FORBIDDEN,
        ApiError::NoWalletExtension | ApiError::NotConnected(_) => StatusCode::PRECONDITION_FAILED,
        ApiError::Network { .. } | ApiError::Wallet(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: ApiError) -> (StatusCode, String) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, err.to_string())
}

/// Build the API router with all routes, to be nested under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_handler))
        // Chains and balances
        .route("/chains", get(chains::list_chains_handler))
        .route("/balances/:address", get(balance::get_balances_handler))
        // Wallet
        .merge(wallet::create_wallet_router())
        // Flows
        .route("/flow", get(flow::get_flow_handler).post(flow::flow_command_handler))
        .route("/flow/refresh", post(flow::refresh_balances_handler))
        .route("/send", get(send::get_send_handler))
        .route("/send/start", post(send::start_send_handler))
        .route("/send/next", post(send::next_send_handler))
        .route("/send/cancel", post(send::cancel_send_handler))
}

/// The full application: the API under `/api`, bound to `state`.
pub fn create_app(state: AppState) -> Router {
    Router::new().nest("/api", create_router()).with_state(state)
}
