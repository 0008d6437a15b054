//! In-memory storage implementation for testing.

use anyhow::Result;
use tokio::sync::Mutex;

use crate::mapping::MappingRuleset;
use crate::models::Transaction;

use super::{FingerprintStore, RulesetStore, TransactionStore};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    ruleset: Mutex<Option<MappingRuleset>>,
    fingerprints: Mutex<Vec<String>>,
    transactions: Mutex<Vec<Transaction>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            ruleset: Mutex::new(None),
            fingerprints: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RulesetStore for MemoryStorage {
    async fn load_ruleset(&self) -> Result<Option<MappingRuleset>> {
        Ok(self.ruleset.lock().await.clone())
    }

    async fn save_ruleset(&self, ruleset: &MappingRuleset) -> Result<()> {
        *self.ruleset.lock().await = Some(ruleset.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl FingerprintStore for MemoryStorage {
    async fn load_fingerprints(&self) -> Result<Vec<String>> {
        Ok(self.fingerprints.lock().await.clone())
    }

    async fn save_fingerprints(&self, keys: &[String]) -> Result<()> {
        *self.fingerprints.lock().await = keys.to_vec();
        Ok(())
    }
}

#[async_trait::async_trait]
impl TransactionStore for MemoryStorage {
    async fn load_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.lock().await.clone())
    }

    async fn append_transactions(&self, txns: &[Transaction]) -> Result<()> {
        self.transactions.lock().await.extend_from_slice(txns);
        Ok(())
    }
}
