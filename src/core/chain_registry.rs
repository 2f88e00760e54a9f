//! Chain Registry
//!
//! Resolves human-entered chain names ("eth", "bsc") to provider chain ids.
//!
//! Features:
//! - Full chain list cached for one hour, replaced wholesale on refresh
//! - Readers always see a complete snapshot (`Arc` swap under a write lock)
//! - Concurrent refreshes collapse into one upstream call
//! - Stale snapshot served when a refresh fails
//! - Fuzzy substring matching, first match in provider order

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::models::errors::AppError;
use crate::models::types::Chain;
use crate::providers::SecurityProvider;
use crate::utils::constants::CHAIN_CACHE_TTL_SECS;

/// Chain list freshness window
pub const CHAIN_CACHE_TTL: Duration = Duration::from_secs(CHAIN_CACHE_TTL_SECS);

/// One complete chain list as fetched, keyed by lowercase name.
///
/// Iteration order is the provider's order. When two chains share a
/// lowercase name the later one wins but keeps the earlier position.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    entries: Vec<(String, Chain)>,
    index: HashMap<String, usize>,
    fetched_at: Option<Instant>,
}

impl ChainSnapshot {
    /// Snapshot with no chains and no fetch time
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            fetched_at: None,
        }
    }

    pub fn from_chains(chains: Vec<Chain>, fetched_at: Instant) -> Self {
        let mut entries: Vec<(String, Chain)> = Vec::with_capacity(chains.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(chains.len());

        for chain in chains {
            let key = chain.name.to_lowercase();
            match index.get(&key) {
                Some(&pos) => entries[pos].1 = chain,
                None => {
                    index.insert(key.clone(), entries.len());
                    entries.push((key, chain));
                }
            }
        }

        Self {
            entries,
            index,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup by lowercase name
    pub fn get(&self, key: &str) -> Option<&Chain> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    /// (lowercase name, chain) in provider order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Chain)> {
        self.entries.iter().map(|(key, chain)| (key.as_str(), chain))
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.fetched_at
    }

    /// Fresh while younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at
            .map(|at| at.elapsed() < ttl)
            .unwrap_or(false)
    }

    /// Exact match first, then the first entry where either name contains
    /// the other.
    pub fn find(&self, name: &str) -> Option<&Chain> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(chain) = self.get(&needle) {
            return Some(chain);
        }

        self.iter()
            .find(|(key, _)| key.contains(needle.as_str()) || needle.contains(key))
            .map(|(_, chain)| chain)
    }
}

/// Chain cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct ChainCacheStats {
    pub entries: usize,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
}

/// Time-bounded cache of the provider's chain list
pub struct ChainRegistry {
    provider: Arc<dyn SecurityProvider>,
    ttl: Duration,
    /// Last successfully fetched list
    snapshot: RwLock<Option<Arc<ChainSnapshot>>>,
    /// Serializes refreshes
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

impl ChainRegistry {
    /// Registry with the default one-hour TTL
    pub fn new(provider: Arc<dyn SecurityProvider>) -> Self {
        Self::with_ttl(provider, CHAIN_CACHE_TTL)
    }

    pub fn with_ttl(provider: Arc<dyn SecurityProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
        }
    }

    fn current(&self) -> Option<Arc<ChainSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn current_fresh(&self) -> Option<Arc<ChainSnapshot>> {
        self.current().filter(|snapshot| snapshot.is_fresh(self.ttl))
    }

    /// Cached chain list, refreshed when older than the TTL.
    ///
    /// Never fails: a failed refresh serves the previous list, or an empty one
    /// when nothing was ever fetched.
    pub async fn chain_list(&self) -> Arc<ChainSnapshot> {
        if let Some(snapshot) = self.current_fresh() {
            debug!("📋 Chain list cache HIT ({} chains)", snapshot.len());
            return snapshot;
        }

        let seen_attempts = self.attempts.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(snapshot) = self.current_fresh() {
            return snapshot;
        }

        // ...or tried and failed: serve what we have instead of queueing another call
        if self.attempts.load(Ordering::Acquire) != seen_attempts {
            debug!("📋 Chain list refresh already attempted while waiting");
            return self
                .current()
                .unwrap_or_else(|| Arc::new(ChainSnapshot::empty()));
        }

        let fetched = self.provider.chain_list().await;
        self.attempts.fetch_add(1, Ordering::Release);

        match fetched {
            Ok(chains) => {
                let snapshot = Arc::new(ChainSnapshot::from_chains(chains, Instant::now()));
                *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                info!("🔄 Chain list refreshed: {} chains", snapshot.len());
                snapshot
            }
            Err(e) => {
                self.refresh_failures.fetch_add(1, Ordering::Relaxed);
                match self.current() {
                    Some(stale) => {
                        warn!(
                            code = e.code_str(),
                            "⚠️ Chain list refresh failed, serving stale list ({} chains): {}",
                            stale.len(),
                            e
                        );
                        stale
                    }
                    None => {
                        let err = AppError::list_unavailable(e.to_string());
                        error!(code = err.code_str(), "❌ Chain list unavailable: {}", err);
                        Arc::new(ChainSnapshot::empty())
                    }
                }
            }
        }
    }

    /// Resolve a user-entered chain name
    pub async fn find_chain(&self, name: &str) -> Option<Chain> {
        let snapshot = self.chain_list().await;
        let found = snapshot.find(name).cloned();
        match &found {
            Some(chain) => debug!("⛓️ Resolved '{}' -> {} ({})", name, chain.name, chain.id),
            None => info!("📭 No chain matches '{}'", name),
        }
        found
    }

    /// Bulleted chain list for chat replies
    pub async fn format_chain_list(&self) -> String {
        let snapshot = self.chain_list().await;
        if snapshot.is_empty() {
            return "无法获取链列表".to_string();
        }

        let mut message = vec!["📋 支持的链列表:".to_string(), "=".repeat(20)];
        message.extend(
            snapshot
                .iter()
                .map(|(_, chain)| format!("• {} (ID: {})", chain.name, chain.id)),
        );
        message.join("\n")
    }

    pub fn stats(&self) -> ChainCacheStats {
        let snapshot = self.current();
        ChainCacheStats {
            entries: snapshot.as_ref().map(|s| s.len()).unwrap_or(0),
            age_secs: snapshot
                .as_ref()
                .and_then(|s| s.fetched_at())
                .map(|at| at.elapsed().as_secs()),
            ttl_secs: self.ttl.as_secs(),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}
