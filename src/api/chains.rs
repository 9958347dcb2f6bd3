use axum::{extract::State, Json};

use crate::{blockchain::models::ChainConfig, AppState};

/// The networks the dapp knows about, ordered by chain id.
pub async fn list_chains_handler(State(state): State<AppState>) -> Json<Vec<ChainConfig>> {
    Json(state.providers.registry().chains().into_iter().cloned().collect())
}
