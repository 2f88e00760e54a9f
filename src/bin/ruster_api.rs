//! Ruster Shield Webhook Server
//!
//! Receives chat messages from the messaging platform and answers them with
//! token security reports.
//!
//! Usage:
//!   cargo run --bin ruster_api
//!
//! Environment:
//!   PORT / RUSTER_PORT     - Server port (default: 3000)
//!   RUSTER_HOST            - Server host (default: 0.0.0.0)
//!   BOT_VERIFICATION_TOKEN - Required X-Verification-Token value (optional)
//!   GOPLUS_ACCESS_TOKEN    - GoPlus access token (optional)
//!   RUST_LOG               - Log level (default: info)

use ruster_shield::api::{create_router, start_cleanup_task, AppState};
use ruster_shield::utils::constants::{APP_NAME, APP_VERSION};
use ruster_shield::{BotConfig, CommandRouter, GoPlusClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = BotConfig::from_env()?;
    info!("⚙️ Config: {:?}", config);
    if config.verification_token.is_none() {
        warn!("⚠️ BOT_VERIFICATION_TOKEN not set, webhook accepts unauthenticated calls");
    }

    let provider = Arc::new(GoPlusClient::from_config(&config));
    let router = Arc::new(CommandRouter::from_provider(provider, &config));
    let state = Arc::new(AppState::new(router, config.clone()));

    let cleanup = start_cleanup_task(state.rate_limiter.clone());
    info!("🧹 Background cleanup task started");

    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🚀 {} v{} webhook starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("Endpoints:");
    info!("  POST /v1/webhook/message - Chat message in, bot reply out");
    info!("  GET  /v1/stats           - Cache statistics");
    info!("  GET  /v1/health          - Health check");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    cleanup.abort();

    info!("🛑 Shutdown signal received");
    let memo = state.router.security().stats();
    info!(
        "📊 Security memo: {} entries, {} hits, {} misses ({:.1}% hit rate)",
        memo.entries, memo.hits, memo.misses, memo.hit_rate
    );
    info!("👋 Ruster Shield webhook shutdown complete");

    Ok(())
}
