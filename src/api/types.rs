//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::core::{ChainCacheStats, MemoStats};
use crate::models::errors::ErrorCode;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ApiBadRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::from_code(ErrorCode::ApiUnauthorized, "Invalid or missing verification token")
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            details: Some(format!("retry_after: {}", retry_after)),
            ..Self::from_code(
                ErrorCode::ApiRateLimited,
                format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            )
        }
    }

    fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }
}

// ============================================
// Webhook
// ============================================

/// Inbound chat message forwarded by the messaging platform
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookMessageRequest {
    /// Platform user/chat id the reply goes back to
    pub sender_id: String,
    /// Raw message text
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookReplyData {
    pub reply: String,
}

// ============================================
// Stats
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub messages_handled: u64,
    pub handler_failures: u64,
    pub security_memo: MemoStats,
    pub chain_cache: ChainCacheStats,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
