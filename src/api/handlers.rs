//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::middleware::{RateLimitConfig, RateLimiter};
use super::types::*;
use crate::core::CommandRouter;
use crate::models::config::BotConfig;
use crate::utils::constants::APP_VERSION;

/// Reply sent when handling a message blew up
pub const HANDLER_FAILURE_REPLY: &str = "处理消息时出错，请稍后重试";

/// Shared application state
pub struct AppState {
    pub router: Arc<CommandRouter>,
    pub config: BotConfig,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
    messages_handled: AtomicU64,
    handler_failures: AtomicU64,
}

impl AppState {
    pub fn new(router: Arc<CommandRouter>, config: BotConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::per_minute(
            config.rate_limit_per_minute,
        )));

        Self {
            router,
            config,
            rate_limiter,
            start_time: Instant::now(),
            messages_handled: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Webhook Message
// ============================================

pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WebhookMessageRequest>,
) -> Result<Json<ApiResponse<WebhookReplyData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    if req.sender_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("sender_id must not be empty"),
                start.elapsed().as_secs_f64() * 1000.0,
            )),
        ));
    }

    info!(sender = %req.sender_id, "💬 Message received ({} chars)", req.content.chars().count());

    // Own task per message: a panic here must not take the next message down
    let router = state.router.clone();
    let content = req.content;
    let reply = match tokio::spawn(async move { router.handle_message(&content).await }).await {
        Ok(reply) => reply,
        Err(e) => {
            state.handler_failures.fetch_add(1, Ordering::Relaxed);
            if e.is_panic() {
                error!(sender = %req.sender_id, "💥 Message handler panicked");
            } else {
                warn!(sender = %req.sender_id, "⚠️ Message handler cancelled: {}", e);
            }
            HANDLER_FAILURE_REPLY.to_string()
        }
    };

    state.messages_handled.fetch_add(1, Ordering::Relaxed);

    Ok(Json(ApiResponse::success(
        WebhookReplyData { reply },
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        messages_handled: state.messages_handled.load(Ordering::Relaxed),
        handler_failures: state.handler_failures.load(Ordering::Relaxed),
        security_memo: state.router.security().stats(),
        chain_cache: state.router.registry().stats(),
        uptime_seconds: state.uptime_seconds(),
        api_version: APP_VERSION.to_string(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}
