use std::collections::{HashSet, VecDeque};

use sha2::{Digest, Sha256};

use crate::models::Transaction;

/// Width of a dedup time bucket in milliseconds (10 minutes).
const BUCKET_MILLIS: i64 = 600_000;

/// Default bound on the persisted seen-set.
pub const DEFAULT_CAPACITY: usize = 5000;

/// Stable key for "the same real-world purchase described twice".
///
/// Bucketing by 10-minute window collapses SMS + email + retried-webhook
/// variants of one purchase while keeping two same-amount purchases at the
/// same merchant on the same day distinct.
pub fn fingerprint(tx: &Transaction) -> String {
    let bucket = tx.timestamp.timestamp_millis().div_euclid(BUCKET_MILLIS);
    let amount = tx.amount.round_dp(0);
    let digits: String = tx
        .card
        .as_deref()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let card_tail = &digits[digits.len().saturating_sub(4)..];
    let merchant: String = tx.merchant.to_lowercase().chars().take(12).collect();

    let mut hasher = Sha256::new();
    hasher.update(format!("{bucket}|{amount}|{card_tail}|{merchant}"));
    hex::encode(hasher.finalize())
}

/// Bounded insertion-ordered set of accepted fingerprints.
///
/// Oldest keys are evicted past capacity, so very long-running installations
/// eventually forget stale fingerprints and may re-admit old duplicates.
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Seed from persisted keys, oldest first. Keys beyond capacity are
    /// evicted exactly as if they had been admitted live.
    pub fn load(&mut self, keys: Vec<String>) {
        for key in keys {
            self.admit(key);
        }
    }

    /// Returns `true` if the key is new (and records it), `false` for a
    /// duplicate.
    pub fn admit(&mut self, key: String) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        self.order.push_back(key.clone());
        self.seen.insert(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current keys in insertion order, for persistence.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
