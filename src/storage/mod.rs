mod json_file;
mod memory;
mod sealed;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use sealed::{SealedBox, SealedBoxError};

use anyhow::Result;

use crate::mapping::MappingRuleset;
use crate::models::Transaction;

/// Persistence for the user mapping ruleset.
///
/// Load failures must surface as `Err` (they change whether user mappings
/// are active); callers then proceed with an empty ruleset.
#[async_trait::async_trait]
pub trait RulesetStore: Send + Sync {
    async fn load_ruleset(&self) -> Result<Option<MappingRuleset>>;
    /// Replace the stored ruleset wholesale.
    async fn save_ruleset(&self, ruleset: &MappingRuleset) -> Result<()>;
}

/// Persistence for the bounded fingerprint seen-set, loaded at startup and
/// saved after admissions.
#[async_trait::async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn load_fingerprints(&self) -> Result<Vec<String>>;
    async fn save_fingerprints(&self, keys: &[String]) -> Result<()>;
}

/// Persistence for accepted transactions.
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    async fn load_transactions(&self) -> Result<Vec<Transaction>>;
    async fn append_transactions(&self, txns: &[Transaction]) -> Result<()>;
}
