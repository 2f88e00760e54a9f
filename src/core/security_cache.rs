//! Security Query Cache
//!
//! Memoizes token security lookups so repeated checks of the same token do
//! not hit GoPlus again.
//!
//! Features:
//! - Address validation before any upstream call
//! - Token + contract queries issued together, merged into one result
//! - LRU memo (100 keys) keyed by (chain_id, address, timeout)
//! - Failed lookups are never cached
//! - Identical in-flight queries collapse into one upstream round-trip

use dashmap::DashMap;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{SecurityRecord, SecurityResult};
use crate::providers::{RecordMap, SecurityProvider};
use crate::utils::address::{is_valid_address, short_address};
use crate::utils::constants::{DEFAULT_QUERY_TIMEOUT_SECS, SECURITY_MEMO_CAPACITY};

/// Default per-query timeout
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

/// Memo key: the full argument tuple of a lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub chain_id: String,
    pub address: String,
    pub timeout: Duration,
}

impl MemoKey {
    pub fn new(chain_id: &str, address: &str, timeout: Duration) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            address: address.to_string(),
            timeout,
        }
    }
}

/// Memo statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct MemoStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub upstream_failures: u64,
    /// Keys with a query currently running
    pub in_flight: usize,
}

pub struct SecurityQueryCache {
    provider: Arc<dyn SecurityProvider>,
    default_timeout: Duration,
    memo: Mutex<LruCache<MemoKey, Arc<SecurityResult>>>,
    /// One gate per key currently being fetched
    in_flight: DashMap<MemoKey, Gate>,
    hits: AtomicU64,
    misses: AtomicU64,
    upstream_failures: AtomicU64,
}

impl SecurityQueryCache {
    /// Cache with the default capacity (100) and timeout (30s)
    pub fn new(provider: Arc<dyn SecurityProvider>) -> Self {
        Self::with_options(provider, SECURITY_MEMO_CAPACITY, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_options(
        provider: Arc<dyn SecurityProvider>,
        capacity: usize,
        default_timeout: Duration,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            default_timeout,
            memo: Mutex::new(LruCache::new(capacity)),
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Check a token using the default timeout
    pub async fn check_token_security(
        &self,
        chain_id: &str,
        address: &str,
    ) -> AppResult<Arc<SecurityResult>> {
        self.check_token_security_with_timeout(chain_id, address, self.default_timeout)
            .await
    }

    /// Check a token; memoized per (chain_id, address, timeout)
    pub async fn check_token_security_with_timeout(
        &self,
        chain_id: &str,
        address: &str,
        timeout: Duration,
    ) -> AppResult<Arc<SecurityResult>> {
        if !is_valid_address(address) {
            warn!("🚫 Rejected malformed address: {:?}", address);
            return Err(AppError::invalid_address(address));
        }

        let key = MemoKey::new(chain_id, address, timeout);

        if let Some(hit) = self.memo_get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            info!("✅ CACHE HIT: {} on {}", short_address(address), chain_id);
            return Ok(hit);
        }

        let gate = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .value()
            .clone();
        let _permit = gate.lock().await;
        let _in_flight = InFlightGuard {
            map: &self.in_flight,
            key: &key,
            gate: &gate,
        };

        // A query holding the gate before us may have filled the memo
        if let Some(hit) = self.memo_get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("✅ CACHE HIT (after in-flight wait): {}", short_address(address));
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("📭 CACHE MISS: {} on {}", short_address(address), chain_id);

        match self.query_upstream(&key).await {
            Ok(result) => {
                let result = Arc::new(result);
                self.memo_put(key.clone(), result.clone());
                info!("💾 CACHE SET: {} on {}", short_address(address), chain_id);
                Ok(result)
            }
            Err(e) => {
                self.upstream_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    code = e.code_str(),
                    chain_id = %chain_id,
                    "❌ Security check failed for {}: {}",
                    short_address(address),
                    e
                );
                Err(e)
            }
        }
    }

    async fn query_upstream(&self, key: &MemoKey) -> AppResult<SecurityResult> {
        let addresses = vec![key.address.clone()];

        let (token, contract) = tokio::join!(
            tokio::time::timeout(
                key.timeout,
                self.provider
                    .token_security(&key.chain_id, &addresses, key.timeout),
            ),
            tokio::time::timeout(
                key.timeout,
                self.provider
                    .contract_security(&key.chain_id, &addresses, key.timeout),
            ),
        );

        let token = settle(token, "token_security", key.timeout)?;
        let contract = settle(contract, "contract_security", key.timeout)?;

        Ok(SecurityResult::new(
            take_record(token, &key.address),
            take_record(contract, &key.address),
        ))
    }

    fn memo_get(&self, key: &MemoKey) -> Option<Arc<SecurityResult>> {
        self.memo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn memo_put(&self, key: MemoKey, result: Arc<SecurityResult>) {
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((evicted, _)) = memo.push(key, result) {
            debug!("🗑️ CACHE EVICT: {} on {}", short_address(&evicted.address), evicted.chain_id);
        }
    }

    pub fn stats(&self) -> MemoStats {
        let memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MemoStats {
            entries: memo.len(),
            capacity: memo.cap().get(),
            hits,
            misses,
            hit_rate,
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            in_flight: self.in_flight.len(),
        }
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Releases the in-flight slot however the query ends (done, error,
/// cancelled or panicked)
struct InFlightGuard<'a> {
    map: &'a DashMap<MemoKey, Gate>,
    key: &'a MemoKey,
    gate: &'a Gate,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map
            .remove_if(self.key, |_, current| Arc::ptr_eq(current, self.gate));
    }
}

/// Flatten timeout + provider errors into `UpstreamQueryFailed`
fn settle(
    outcome: Result<AppResult<RecordMap>, tokio::time::error::Elapsed>,
    endpoint: &str,
    timeout: Duration,
) -> AppResult<RecordMap> {
    match outcome {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(e)) => Err(e.into_upstream_failure()),
        Err(_) => Err(AppError::upstream_failed(format!(
            "{} timed out after {}s",
            endpoint,
            timeout.as_secs_f64()
        ))),
    }
}

/// Pull the record for `address`; GoPlus lowercases result keys
fn take_record(mut records: RecordMap, address: &str) -> SecurityRecord {
    if let Some(record) = records.remove(address) {
        return record;
    }
    let lower = address.to_lowercase();
    if let Some(record) = records.remove(&lower) {
        return record;
    }
    records
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(address))
        .map(|(_, record)| record)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use crate::providers::InMemoryProvider;

    const TOKEN: &str = "0x1234567890123456789012345678901234567890";

    fn honeypot_record() -> SecurityRecord {
        SecurityRecord {
            token_name: Some("Trap".into()),
            token_symbol: Some("TRAP".into()),
            is_honeypot: Some("1".into()),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<InMemoryProvider>, SecurityQueryCache) {
        let provider = Arc::new(
            InMemoryProvider::with_default_chains()
                .with_token("1", TOKEN, honeypot_record())
                .with_contract(
                    "1",
                    TOKEN,
                    SecurityRecord {
                        is_open_source: Some("0".into()),
                        ..Default::default()
                    },
                ),
        );
        let cache = SecurityQueryCache::new(provider.clone());
        (provider, cache)
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_upstream() {
        let (provider, cache) = setup();
        for bad in ["", "0x123", "hello", "0xZZ34567890123456789012345678901234567890"] {
            let err = cache.check_token_security("1", bad).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidAddressFormat);
        }
        assert_eq!(provider.security_calls(), 0);
    }

    #[tokio::test]
    async fn test_merges_token_and_contract() {
        let (provider, cache) = setup();
        let result = cache.check_token_security("1", TOKEN).await.unwrap();

        assert_eq!(result.token.token_symbol.as_deref(), Some("TRAP"));
        assert_eq!(result.contract.is_open_source.as_deref(), Some("0"));
        assert_eq!(provider.token_calls(), 1);
        assert_eq!(provider.contract_calls(), 1);
    }

    #[tokio::test]
    async fn test_memoized_identical_call() {
        let (provider, cache) = setup();
        let first = cache.check_token_security("1", TOKEN).await.unwrap();
        let second = cache.check_token_security("1", TOKEN).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.security_calls(), 2);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_part_of_key() {
        let (provider, cache) = setup();
        cache
            .check_token_security_with_timeout("1", TOKEN, Duration::from_secs(30))
            .await
            .unwrap();
        cache
            .check_token_security_with_timeout("1", TOKEN, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(provider.security_calls(), 4);
    }

    #[tokio::test]
    async fn test_checksum_address_finds_lowercase_result() {
        let address = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
        let provider = Arc::new(InMemoryProvider::new().with_token(
            "1",
            address,
            SecurityRecord {
                token_symbol: Some("USDT".into()),
                ..Default::default()
            },
        ));
        let cache = SecurityQueryCache::new(provider);
        let result = cache.check_token_security("1", address).await.unwrap();
        assert_eq!(result.token.token_symbol.as_deref(), Some("USDT"));
    }

    #[tokio::test]
    async fn test_unknown_token_yields_empty_result() {
        let (_, cache) = setup();
        let result = cache
            .check_token_security("56", "0x0000000000000000000000000000000000000001")
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let (provider, cache) = setup();
        provider.set_fail_security(true);

        let err = cache.check_token_security("1", TOKEN).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamQueryFailed);
        assert_eq!(cache.stats().entries, 0);

        provider.set_fail_security(false);
        let ok = cache.check_token_security("1", TOKEN).await;
        assert!(ok.is_ok());
        assert_eq!(cache.stats().upstream_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_upstream_failure() {
        let (provider, cache) = setup();
        provider.set_delay(Some(Duration::from_secs(60)));

        let err = cache
            .check_token_security_with_timeout("1", TOKEN, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamQueryFailed);
        assert!(err.message.contains("timed out"));
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let provider = Arc::new(InMemoryProvider::new());
        let cache = SecurityQueryCache::with_options(provider.clone(), 2, DEFAULT_QUERY_TIMEOUT);
        let a = "0x000000000000000000000000000000000000000a";
        let b = "0x000000000000000000000000000000000000000b";
        let c = "0x000000000000000000000000000000000000000c";

        cache.check_token_security("1", a).await.unwrap();
        cache.check_token_security("1", b).await.unwrap();
        // touch a so b becomes least recently used
        cache.check_token_security("1", a).await.unwrap();
        cache.check_token_security("1", c).await.unwrap();
        assert_eq!(provider.security_calls(), 6);

        // a still cached, b evicted
        cache.check_token_security("1", a).await.unwrap();
        assert_eq!(provider.security_calls(), 6);
        cache.check_token_security("1", b).await.unwrap();
        assert_eq!(provider.security_calls(), 8);
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_checks_release_in_flight_slots() {
        let (provider, cache) = setup();
        provider.set_delay(Some(Duration::from_secs(10)));

        for i in 0..50u32 {
            let address = format!("0x{:040x}", i);
            let outcome = tokio::time::timeout(
                Duration::from_secs(1),
                cache.check_token_security("1", &address),
            )
            .await;
            assert!(outcome.is_err());
        }

        let stats = cache.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_in_flight_empty_after_success_and_failure() {
        let (provider, cache) = setup();
        cache.check_token_security("1", TOKEN).await.unwrap();
        provider.set_fail_security(true);
        let other = "0x00000000000000000000000000000000000000ff";
        assert!(cache.check_token_security("1", other).await.is_err());
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_queries_collapse() {
        let (provider, cache) = setup();
        provider.set_delay(Some(Duration::from_millis(200)));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.check_token_security("1", TOKEN).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(provider.security_calls(), 2);
    }
}
