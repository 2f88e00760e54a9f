//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so bot replies and logs stay
//! consistent. Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - TOKEN_xxx / CHAIN_xxx: user input that cannot be resolved
//! - UPSTREAM_xxx: GoPlus provider failures
//! - API_xxx: webhook API errors
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message (for logs, never sent to chat users)
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Short localized description that is safe to show in a chat reply
    pub fn user_message(&self) -> &'static str {
        self.code.user_message()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors
    // ============================================
    /// Token address is not `0x` + 40 hex characters
    InvalidAddressFormat,
    /// Chain name did not resolve against the chain list
    ChainNotFound,

    // ============================================
    // Upstream (GoPlus) Errors
    // ============================================
    /// Network/provider failure or timeout during a security query
    UpstreamQueryFailed,
    /// Chain list fetch failed and no previous list is cached
    UpstreamListUnavailable,
    /// Upstream answered with a body we could not interpret
    UpstreamInvalidResponse,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Verification token missing or wrong
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAddressFormat => "TOKEN_INVALID_ADDRESS",
            Self::ChainNotFound => "CHAIN_NOT_FOUND",

            Self::UpstreamQueryFailed => "UPSTREAM_QUERY_FAILED",
            Self::UpstreamListUnavailable => "UPSTREAM_LIST_UNAVAILABLE",
            Self::UpstreamInvalidResponse => "UPSTREAM_INVALID_RESPONSE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::InvalidAddressFormat | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::ChainNotFound => 404,
            Self::ApiRateLimited => 429,
            Self::UpstreamQueryFailed | Self::UpstreamInvalidResponse => 502,
            Self::UpstreamListUnavailable => 503,
            Self::Unknown => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamQueryFailed
                | Self::UpstreamListUnavailable
                | Self::UpstreamInvalidResponse
                | Self::ApiRateLimited
        )
    }

    /// Localized short description for chat replies
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAddressFormat => "无效的代币地址格式",
            Self::ChainNotFound => "未找到对应的链",
            Self::UpstreamQueryFailed | Self::UpstreamInvalidResponse => {
                "安全服务暂时不可用，请稍后重试"
            }
            Self::UpstreamListUnavailable => "链列表暂时不可用",
            Self::ApiBadRequest => "请求格式错误",
            Self::ApiUnauthorized => "未授权的请求",
            Self::ApiRateLimited => "请求过于频繁，请稍后再试",
            Self::ConfigInvalidValue | Self::Unknown => "内部错误，请稍后重试",
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Invalid token address
    pub fn invalid_address(address: &str) -> Self {
        Self::new(
            ErrorCode::InvalidAddressFormat,
            format!("Invalid token address format: {}", address),
        )
    }

    /// Chain name did not resolve
    pub fn chain_not_found(name: &str) -> Self {
        Self::new(ErrorCode::ChainNotFound, format!("Chain not found: {}", name))
    }

    /// Upstream query failed
    pub fn upstream_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamQueryFailed, msg)
    }

    /// Chain list unavailable
    pub fn list_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamListUnavailable, msg)
    }

    /// Upstream answered with something unusable
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamInvalidResponse, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// Re-tag any error as an upstream query failure, keeping the original text.
    pub fn into_upstream_failure(self) -> Self {
        match self.code {
            ErrorCode::UpstreamQueryFailed => self,
            _ => Self {
                code: ErrorCode::UpstreamQueryFailed,
                message: format!("[{}] {}", self.code.as_str(), self.message),
                source: self.source,
            },
        }
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::UpstreamQueryFailed, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::UpstreamQueryFailed, "Connection failed")
        } else if err.is_decode() {
            Self::new(ErrorCode::UpstreamInvalidResponse, err.to_string())
        } else {
            Self::new(ErrorCode::UpstreamQueryFailed, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::UpstreamInvalidResponse, "JSON parse error", err)
    }
}
