//! Configuration module for the token security bot
//!
//! Uses constants from utils/constants.rs as defaults; every value can be
//! overridden through the environment.

use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_PER_MINUTE,
    GOPLUS_BASE_URL,
};

/// Runtime configuration for the bot, the GoPlus client and the webhook server
#[derive(Clone)]
pub struct BotConfig {
    /// GoPlus API base URL
    pub goplus_base_url: String,
    /// Optional GoPlus access token (sent as Authorization header)
    pub goplus_access_token: Option<String>,
    /// Default timeout for token/contract security queries
    pub query_timeout: Duration,
    /// Webhook bind host
    pub host: String,
    /// Webhook bind port
    pub port: u16,
    /// Shared secret the messaging platform sends with every webhook call
    pub verification_token: Option<String>,
    /// Requests per minute per caller
    pub rate_limit_per_minute: u32,
}

impl std::fmt::Debug for BotConfig {
    // Secrets are never printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("goplus_base_url", &self.goplus_base_url)
            .field("goplus_access_token", &self.goplus_access_token.as_ref().map(|_| "***"))
            .field("query_timeout", &self.query_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("verification_token", &self.verification_token.as_ref().map(|_| "***"))
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            goplus_base_url: GOPLUS_BASE_URL.to_string(),
            goplus_access_token: None,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            verification_token: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment:
    ///   GOPLUS_BASE_URL        - API base (default: public GoPlus endpoint)
    ///   GOPLUS_ACCESS_TOKEN    - optional access token
    ///   GOPLUS_TIMEOUT_SECS    - query timeout (default: 30)
    ///   RUSTER_HOST            - server host (default: 0.0.0.0)
    ///   PORT / RUSTER_PORT     - server port (default: 3000)
    ///   BOT_VERIFICATION_TOKEN - webhook shared secret (optional)
    ///   RATE_LIMIT_PER_MINUTE  - per caller (default: 60)
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (env, test map, ...)
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("GOPLUS_BASE_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AppError::invalid_config("GOPLUS_BASE_URL", &url));
            }
            config.goplus_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(token) = get("GOPLUS_ACCESS_TOKEN") {
            info!("🔑 GOPLUS_ACCESS_TOKEN configured (token hidden for security)");
            config.goplus_access_token = Some(token);
        }

        if let Some(raw) = get("GOPLUS_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| AppError::invalid_config("GOPLUS_TIMEOUT_SECS", &raw))?;
            config.query_timeout = Duration::from_secs(secs);
        }

        if let Some(host) = get("RUSTER_HOST") {
            config.host = host;
        }

        // Hosting platforms set PORT, fallback to RUSTER_PORT for local dev
        if let Some(raw) = get("PORT").or_else(|| get("RUSTER_PORT")) {
            config.port = raw
                .parse()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?;
        }

        config.verification_token = get("BOT_VERIFICATION_TOKEN");

        if let Some(raw) = get("RATE_LIMIT_PER_MINUTE") {
            config.rate_limit_per_minute = raw
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AppError::invalid_config("RATE_LIMIT_PER_MINUTE", &raw))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.goplus_base_url, GOPLUS_BASE_URL);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.port, 3000);
        assert!(config.verification_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = BotConfig::from_lookup(lookup(&[
            ("GOPLUS_BASE_URL", "http://localhost:9000/api/v1/"),
            ("GOPLUS_TIMEOUT_SECS", "10"),
            ("RUSTER_PORT", "8080"),
            ("BOT_VERIFICATION_TOKEN", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(config.goplus_base_url, "http://localhost:9000/api/v1");
        assert_eq!(config.query_timeout, Duration::from_secs(10));
        assert_eq!(config.port, 8080);
        assert_eq!(config.verification_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_port_prefers_platform_var() {
        let config =
            BotConfig::from_lookup(lookup(&[("PORT", "9999"), ("RUSTER_PORT", "8080")])).unwrap();
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BotConfig::from_lookup(lookup(&[("GOPLUS_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = BotConfig::from_lookup(lookup(&[("GOPLUS_BASE_URL", "ftp://x")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = BotConfig {
            verification_token: Some("s3cret".into()),
            goplus_access_token: Some("tok".into()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("tok\""));
    }
}
