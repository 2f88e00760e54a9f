//! Constants Module - Single Source of Truth
//!
//! All constants shared by the bot live here. No hardcoded values in other
//! modules!

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RusterShield";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("RusterShield/", env!("CARGO_PKG_VERSION"));

// ============================================
// GOPLUS CONSTANTS
// ============================================

/// GoPlus public API base URL
pub const GOPLUS_BASE_URL: &str = "https://api.gopluslabs.io/api/v1";

/// GoPlus success code in the response envelope
pub const GOPLUS_SUCCESS_CODE: i64 = 1;

/// Default timeout for a single security query (seconds)
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Timeout for the chain list request (seconds)
pub const CHAIN_LIST_TIMEOUT_SECS: u64 = 15;

// ============================================
// CACHE CONSTANTS
// ============================================

/// Chain list stays fresh for one hour
pub const CHAIN_CACHE_TTL_SECS: u64 = 3600;

/// Distinct (chain, address, timeout) keys kept by the security memo
pub const SECURITY_MEMO_CAPACITY: usize = 100;

// ============================================
// REPORT CONSTANTS
// ============================================

/// Buy/sell tax above this percentage triggers a warning line
pub const HIGH_TAX_THRESHOLD_PERCENT: f64 = 5.0;

// ============================================
// COMMAND CONSTANTS
// ============================================

/// Messages that request the chain list (compared trimmed + lowercase)
pub const LIST_CHAINS_SYNONYMS: [&str; 3] = ["链列表", "chains", "list"];

/// Check command: keyword, chain name token, EVM address
pub const CHECK_COMMAND_PATTERN: &str = r"(?:检查|(?i:check))\s+(\w+)\s+(0x[a-fA-F0-9]{40})";

/// Length of the hex part of an EVM address
pub const ADDRESS_HEX_LEN: usize = 40;

// ============================================
// SERVER CONSTANTS
// ============================================

/// Default webhook port
pub const DEFAULT_PORT: u16 = 3000;

/// Default webhook host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default requests per minute per caller
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Header carrying the shared verification token
pub const VERIFICATION_HEADER: &str = "X-Verification-Token";
