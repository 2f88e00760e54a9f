//! In-memory SecurityProvider
//!
//! Serves fixed chains and records without network access. Counts every call
//! and can be switched into failure or slow mode, which makes it the provider
//! used for offline runs (`ruster_shield --offline`) and for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::goplus::{RecordMap, SecurityProvider};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Chain, SecurityRecord};

type RecordKey = (String, String);

#[derive(Default)]
pub struct InMemoryProvider {
    chains: Mutex<Vec<Chain>>,
    token_records: Mutex<HashMap<RecordKey, SecurityRecord>>,
    contract_records: Mutex<HashMap<RecordKey, SecurityRecord>>,
    fail_chain_list: AtomicBool,
    fail_security: AtomicBool,
    delay: Mutex<Option<Duration>>,
    chain_list_delay: Mutex<Option<Duration>>,
    chain_list_calls: AtomicUsize,
    token_calls: AtomicUsize,
    contract_calls: AtomicUsize,
}

fn record_key(chain_id: &str, address: &str) -> RecordKey {
    (chain_id.to_string(), address.to_lowercase())
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small list mirroring the first GoPlus entries
    pub fn with_default_chains() -> Self {
        Self::new().with_chains(vec![
            Chain::new("1", "Ethereum"),
            Chain::new("56", "BSC"),
            Chain::new("42161", "Arbitrum"),
            Chain::new("137", "Polygon"),
            Chain::new("solana", "Solana"),
            Chain::new("8453", "Base"),
        ])
    }

    pub fn with_chains(self, chains: Vec<Chain>) -> Self {
        self.set_chains(chains);
        self
    }

    pub fn with_token(self, chain_id: &str, address: &str, record: SecurityRecord) -> Self {
        self.token_records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record_key(chain_id, address), record);
        self
    }

    pub fn with_contract(self, chain_id: &str, address: &str, record: SecurityRecord) -> Self {
        self.contract_records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record_key(chain_id, address), record);
        self
    }

    pub fn set_chains(&self, chains: Vec<Chain>) {
        *self.chains.lock().unwrap_or_else(|e| e.into_inner()) = chains;
    }

    pub fn set_fail_chain_list(&self, fail: bool) {
        self.fail_chain_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_security(&self, fail: bool) {
        self.fail_security.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every security query
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Sleep this long inside every chain list call
    pub fn set_chain_list_delay(&self, delay: Option<Duration>) {
        *self.chain_list_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    pub fn chain_list_calls(&self) -> usize {
        self.chain_list_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn contract_calls(&self) -> usize {
        self.contract_calls.load(Ordering::SeqCst)
    }

    /// Token + contract queries issued so far
    pub fn security_calls(&self) -> usize {
        self.token_calls() + self.contract_calls()
    }

    async fn lookup(
        &self,
        table: &Mutex<HashMap<RecordKey, SecurityRecord>>,
        chain_id: &str,
        addresses: &[String],
    ) -> AppResult<RecordMap> {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_security.load(Ordering::SeqCst) {
            return Err(AppError::upstream_failed("in-memory provider set to fail"));
        }

        let table = table.lock().unwrap_or_else(|e| e.into_inner());
        // Keys come back lowercased, like GoPlus does
        Ok(addresses
            .iter()
            .filter_map(|address| {
                table
                    .get(&record_key(chain_id, address))
                    .map(|record| (address.to_lowercase(), record.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl SecurityProvider for InMemoryProvider {
    async fn chain_list(&self) -> AppResult<Vec<Chain>> {
        self.chain_list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.chain_list_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_chain_list.load(Ordering::SeqCst) {
            return Err(AppError::upstream_failed("in-memory chain list set to fail"));
        }
        Ok(self.chains.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn token_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        _timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(&self.token_records, chain_id, addresses).await
    }

    async fn contract_security(
        &self,
        chain_id: &str,
        addresses: &[String],
        _timeout: Duration,
    ) -> AppResult<RecordMap> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(&self.contract_records, chain_id, addresses).await
    }
}
