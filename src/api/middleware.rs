//! API Middleware (Verification, Rate Limiting, Logging)

use axum::{
    extract::{Json, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::handlers::AppState;
use super::types::{ApiError, ApiResponse};
use crate::utils::constants::VERIFICATION_HEADER;

/// Rate limiter configuration
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl RateLimitConfig {
    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests_per_window: requests,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// In-memory fixed-window rate limiter keyed by caller
pub struct RateLimiter {
    /// Request counts per caller
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let remaining = self.config.requests_per_window.saturating_sub(entry.0);
        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= self.config.requests_per_window {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        (true, remaining - 1, reset_secs)
    }

    /// Drop callers idle for two windows. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests.retain(|_, (_, timestamp)| {
            now.duration_since(*timestamp) < self.config.window_duration * 2
        });
        before.saturating_sub(self.requests.len())
    }

    pub fn tracked_callers(&self) -> usize {
        self.requests.len()
    }
}

/// Periodically prune the rate limiter table
pub fn start_cleanup_task(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = limiter.cleanup();
            if removed > 0 {
                info!("🧹 Rate limiter cleanup: {} idle callers removed", removed);
            }
        }
    })
}

fn is_public_path(path: &str) -> bool {
    path == "/health" || path == "/v1/health"
}

/// Error reply in the usual `ApiResponse` envelope
fn reject(status: StatusCode, error: ApiError, start: Instant) -> Response {
    (
        status,
        Json(ApiResponse::error(error, start.elapsed().as_secs_f64() * 1000.0)),
    )
        .into_response()
}

/// Shared-token verification for webhook calls.
/// Open when no token is configured.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let expected = match state.config.verification_token.as_deref() {
        Some(token) => token,
        None => return next.run(request).await,
    };

    let provided = headers
        .get(VERIFICATION_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            warn!("🔒 Invalid verification token attempted");
            reject(StatusCode::UNAUTHORIZED, ApiError::unauthorized(), start)
        }
        None => {
            warn!("🔒 Missing {} header", VERIFICATION_HEADER);
            reject(StatusCode::UNAUTHORIZED, ApiError::unauthorized(), start)
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    // First hop of X-Forwarded-For, then X-Real-IP
    let rate_key = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("X-Real-IP")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string());

    let (allowed, remaining, reset) = state.rate_limiter.check(&rate_key);

    if !allowed {
        warn!(key = %rate_key, "🚦 Rate limit exceeded");
        let mut response = reject(
            StatusCode::TOO_MANY_REQUESTS,
            ApiError::rate_limited(reset),
            start,
        );
        response.headers_mut().insert("Retry-After", reset.into());
        return response;
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

/// Request logging middleware, tags each response with a request id
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = uuid::Uuid::new_v4().to_string();

    let mut response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-Id", value);
    }

    response
}
