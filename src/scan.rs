use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::extract::{BillReminder, RawMessage};
use crate::models::Transaction;
use crate::pipeline::{Pipeline, Processed, Rejection};
use crate::storage::{FingerprintStore, TransactionStore};

/// Source of raw alert messages.
///
/// `list_messages` must return ids in a stable order; a scan processes them
/// exactly in that order with no reordering.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    fn name(&self) -> &str;
    async fn list_messages(&self) -> Result<Vec<String>>;
    async fn fetch_message(&self, id: &str) -> Result<RawMessage>;
}

/// Directory of exported messages, one JSON file per message. Ships for
/// offline use and tests; a live mailbox client is an external collaborator
/// implementing the same trait.
pub struct DirMessageSource {
    dir: PathBuf,
}

impl DirMessageSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn message_file(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait::async_trait]
impl MessageSource for DirMessageSource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn list_messages(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read message directory {:?}", self.dir))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to list directory")? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn fetch_message(&self, id: &str) -> Result<RawMessage> {
        let path = self.message_file(id);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read message file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse message JSON from {:?}", path))
    }
}

/// What a scan produced.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub accepted: Vec<Transaction>,
    pub reminders: Vec<BillReminder>,
    pub scanned: usize,
    pub noise: usize,
    pub no_amount: usize,
    pub duplicates: usize,
    pub fetch_failures: usize,
}

/// Drives the pipeline over a message source and persists state after.
pub struct Scanner<'a> {
    pipeline: &'a mut Pipeline,
    fingerprints: &'a dyn FingerprintStore,
    transactions: Option<&'a dyn TransactionStore>,
}

impl<'a> Scanner<'a> {
    pub fn new(pipeline: &'a mut Pipeline, fingerprints: &'a dyn FingerprintStore) -> Self {
        Self {
            pipeline,
            fingerprints,
            transactions: None,
        }
    }

    pub fn with_transaction_store(mut self, store: &'a dyn TransactionStore) -> Self {
        self.transactions = Some(store);
        self
    }

    /// Process every listed message in order.
    ///
    /// Per-message fetch failures are logged and skipped; only a failure to
    /// list the batch aborts the scan. The fingerprint set is persisted after
    /// each admission, so messages accepted before an abort stay deduplicated
    /// on the next scan.
    pub async fn scan(&mut self, source: &dyn MessageSource) -> Result<ScanOutcome> {
        let ids = source
            .list_messages()
            .await
            .with_context(|| format!("Failed to list messages from {} source", source.name()))?;
        tracing::info!(source = source.name(), count = ids.len(), "starting scan");

        let mut outcome = ScanOutcome::default();
        for id in &ids {
            let msg = match source.fetch_message(id).await {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::warn!(id, %err, "failed to fetch message, skipping");
                    outcome.fetch_failures += 1;
                    continue;
                }
            };
            outcome.scanned += 1;

            if let Some(reminder) = self.pipeline.bill_reminder(&msg) {
                outcome.reminders.push(reminder);
            }

            match self.pipeline.process_message(&msg) {
                Processed::Accepted(tx) => {
                    self.fingerprints
                        .save_fingerprints(&self.pipeline.fingerprints())
                        .await
                        .context("Failed to persist fingerprints")?;
                    outcome.accepted.push(tx);
                }
                Processed::Rejected(Rejection::Noise) => outcome.noise += 1,
                Processed::Rejected(Rejection::BillDue) => {}
                Processed::Rejected(Rejection::NoAmount) => outcome.no_amount += 1,
                Processed::Rejected(Rejection::Duplicate) => outcome.duplicates += 1,
            }
        }

        if !outcome.accepted.is_empty() {
            if let Some(store) = self.transactions {
                store
                    .append_transactions(&outcome.accepted)
                    .await
                    .context("Failed to persist accepted transactions")?;
            }
        }

        tracing::info!(
            accepted = outcome.accepted.len(),
            noise = outcome.noise,
            no_amount = outcome.no_amount,
            duplicates = outcome.duplicates,
            "scan finished"
        );
        Ok(outcome)
    }
}
