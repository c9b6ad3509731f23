//! In-memory lookup caches
//!
//! Raw transactions and derived contract addresses are immutable once
//! confirmed, so a plain map with no eviction is enough for a decoding
//! session. The decoder core never touches these; callers that resolve many
//! transactions wrap their `TxSource` usage with one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Raw transaction hex keyed by txid
#[derive(Clone, Default)]
pub struct RawTxCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl RawTxCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, txid: &str) -> Option<String> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let hit = entries.get(txid).cloned();
        let mut stats = self.stats.lock().expect("cache lock poisoned");
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    pub fn insert(&self, txid: &str, raw_hex: String) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        if entries.insert(txid.to_string(), raw_hex).is_none() {
            debug!(%txid, "cached raw transaction");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().expect("cache lock poisoned")
    }
}

/// Derived contract addresses keyed by the script hex they came from
#[derive(Clone, Default)]
pub struct ContractAddressCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl ContractAddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, script_hex: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .get(script_hex)
            .cloned()
    }

    pub fn insert(&self, script_hex: &str, address: String) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(script_hex.to_string(), address);
    }
}
