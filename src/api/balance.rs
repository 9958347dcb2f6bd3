use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{
    api::{error_response, ApiResult},
    blockchain::models::{Asset, Balance, ChainId},
    fields::{EthAddressField, FieldFns, TokenAmountField},
    AppState,
};

// Defines the structure for the JSON output returned by our API.
#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub chain_id: ChainId,
    pub symbol: String,
    /// Token contract, absent for the native currency.
    pub token: Option<String>,
    /// Amount in the smallest unit.
    pub amount: String,
    /// Amount scaled by the asset's decimals.
    pub formatted: String,
}

impl From<Balance> for BalanceOutput {
    fn from(balance: Balance) -> Self {
        let formatted = TokenAmountField::new(balance.asset.decimals()).to_text(&balance.amount);
        let (chain_id, symbol, token) = match balance.asset {
            Asset::Native { chain_id, currency } => (chain_id, currency.symbol, None),
            Asset::Token(token) => (token.chain_id(), token.symbol, Some(token.config.address)),
        };
        Self {
            chain_id,
            symbol,
            token,
            amount: balance.amount.to_string(),
            formatted,
        }
    }
}

// The handler function for the GET /balances/{address} endpoint.
pub async fn get_balances_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<BalanceOutput>> {
    let owner = EthAddressField.parse(&address).map_err(error_response)?;
    info!("Fetching balances for {:?}", owner);

    let balances = state
        .providers
        .get_balances(owner, &state.config.tokens)
        .await
        .map_err(error_response)?;
    Ok(Json(balances.into_iter().map(BalanceOutput::from).collect()))
}
