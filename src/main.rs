// src/main.rs

use std::net::SocketAddr;

use anyhow::Context;
use token_store_dapp::{api::create_app, config::Config, AppState};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = create_app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("🚀 HTTP Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_store_dapp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            return;
        }
    };

    if config.wallet_rpc_url.is_none() {
        warn!("WALLET_RPC_URL is not set, wallet connections will fail");
    }
    info!(
        "Token store at {:?} on chain {}, {} chains configured",
        config.store.address,
        config.store.chain_id,
        config.chains.len()
    );

    let app_state = AppState::from_config(config);

    if let Err(e) = run_http_server(app_state).await {
        error!("❌ {:#}", e);
    }
}
