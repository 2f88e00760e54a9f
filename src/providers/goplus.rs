//! GoPlus Security API Client
//!
//! Three endpoints are used:
//! - `GET /supported_chains` - chain list for name resolution
//! - `GET /token_security/{chain_id}?contract_addresses=..` - token risk data
//! - `GET /contract_security/{chain_id}?contract_addresses=..` - contract flags
//!
//! Every response is wrapped in `{code, message, result}`; `code != 1` is an
//! API-level error even when the HTTP status is 200.
//!
//! API: https://api.gopluslabs.io/api/v1 (free tier, access token optional)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::BotConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Chain, SecurityRecord};
use crate::utils::constants::{
    CHAIN_LIST_TIMEOUT_SECS, GOPLUS_BASE_URL, GOPLUS_SUCCESS_CODE, USER_AGENT as USER_AGENT_CONST,
};

/// Per-address records keyed by the address string the provider returned
pub type RecordMap = HashMap<String, SecurityRecord>;

/// Upstream source of chain lists and security records.
///
/// The core only talks to this trait so tests can swap in a counting mock.
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    /// Full list of supported chains, in provider order
    async fn chain_list(&self) -> AppResult<Vec<Chain>>;

    /// Token security records for `addresses` on `chain_id`
    async fn token_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap>;

    /// Contract security records for `addresses` on `chain_id`
    async fn contract_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap>;
}

/// GoPlus response envelope
#[derive(Debug, Deserialize)]
pub struct GoPlusResponse<T> {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub result: Option<T>,
}

impl<T> GoPlusResponse<T> {
    /// Unwrap `result`, turning API error codes into `AppError`
    pub fn into_result(self, endpoint: &str) -> AppResult<T> {
        if let Some(code) = self.code {
            if code != GOPLUS_SUCCESS_CODE {
                return Err(AppError::upstream_failed(format!(
                    "GoPlus {} returned code {}: {}",
                    endpoint,
                    code,
                    self.message.as_deref().unwrap_or("no message")
                )));
            }
        }
        self.result.ok_or_else(|| {
            AppError::invalid_response(format!("GoPlus {} response has no result", endpoint))
        })
    }
}

/// Decode a raw GoPlus body
pub fn parse_envelope<T: DeserializeOwned>(body: &str, endpoint: &str) -> AppResult<T> {
    let envelope: GoPlusResponse<T> = serde_json::from_str(body)?;
    envelope.into_result(endpoint)
}

/// GoPlus HTTP client
#[derive(Clone)]
pub struct GoPlusClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GoPlusClient {
    fn default() -> Self {
        Self::new(GOPLUS_BASE_URL, None)
    }
}

impl GoPlusClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = access_token {
            match HeaderValue::from_str(token) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("⚠️ GOPLUS_ACCESS_TOKEN contains invalid header characters, ignored"),
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .build()
            .unwrap_or_else(|e| {
                warn!("⚠️ Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(&config.goplus_base_url, config.goplus_access_token.as_deref())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the URL for a per-chain security endpoint
    pub fn security_url(&self, endpoint: &str, chain_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, endpoint, chain_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
        endpoint: &str,
    ) -> AppResult<T> {
        debug!(url = %url, "GoPlus request");

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream_failed(format!(
                "GoPlus {} HTTP error: {}",
                endpoint, status
            )));
        }

        let body = response.text().await?;
        parse_envelope(&body, endpoint)
    }

    async fn security_query(
        &self,
        endpoint: &str,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap> {
        let url = self.security_url(endpoint, chain_id);
        let query = [("contract_addresses", addresses.join(","))];
        let records: RecordMap = self.get_json(&url, &query, timeout, endpoint).await?;
        info!("📊 GoPlus {}: {} record(s) on chain {}", endpoint, records.len(), chain_id);
        Ok(records)
    }
}

#[async_trait]
impl SecurityProvider for GoPlusClient {
    async fn chain_list(&self) -> AppResult<Vec<Chain>> {
        let url = format!("{}/supported_chains", self.base_url);
        info!("🔍 GoPlus: Fetching supported chains");
        let chains: Vec<Chain> = self
            .get_json(
                &url,
                &[],
                Duration::from_secs(CHAIN_LIST_TIMEOUT_SECS),
                "supported_chains",
            )
            .await?;
        info!("📋 GoPlus: {} chains available", chains.len());
        Ok(chains)
    }

    async fn token_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.security_query("token_security", chain_id, addresses, timeout)
            .await
    }

    async fn contract_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.security_query("contract_security", chain_id, addresses, timeout)
            .await
    }
}
