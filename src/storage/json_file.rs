use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mapping::MappingRuleset;
use crate::models::Transaction;

use super::sealed::SealedBox;
use super::{FingerprintStore, RulesetStore, TransactionStore};

/// JSON file-based storage.
///
/// Directory structure:
/// ```text
/// data/
///   rules/
///     mappings.json        (plain or sealed envelope)
///   fingerprints.json
///   transactions.jsonl
/// ```
pub struct JsonFileStorage {
    base_path: PathBuf,
    sealed: Option<SealedBox>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            sealed: None,
        }
    }

    /// Seal the ruleset file with the given passphrase. Fingerprints and
    /// transactions stay plain; only the user-authored rules are sensitive.
    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.sealed = Some(SealedBox::new(passphrase));
        self
    }

    fn ruleset_file(&self) -> PathBuf {
        self.base_path.join("rules").join("mappings.json")
    }

    fn fingerprints_file(&self) -> PathBuf {
        self.base_path.join("fingerprints.json")
    }

    fn transactions_file(&self) -> PathBuf {
        self.base_path.join("transactions.jsonl")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_text(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match self.read_text(path).await? {
            Some(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        self.ensure_dir(path).await?;
        fs::write(path, content)
            .await
            .context("Failed to write file")?;
        Ok(())
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        self.write_text(path, &content).await
    }
}

#[async_trait::async_trait]
impl RulesetStore for JsonFileStorage {
    async fn load_ruleset(&self) -> Result<Option<MappingRuleset>> {
        let path = self.ruleset_file();
        let Some(content) = self.read_text(&path).await? else {
            return Ok(None);
        };
        let json = match &self.sealed {
            Some(sealed) => {
                let plaintext = sealed
                    .open(&content)
                    .with_context(|| format!("Failed to unseal ruleset at {:?}", path))?;
                String::from_utf8(plaintext).context("Unsealed ruleset is not UTF-8")?
            }
            None => content,
        };
        let ruleset = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse ruleset JSON from {:?}", path))?;
        Ok(Some(ruleset))
    }

    async fn save_ruleset(&self, ruleset: &MappingRuleset) -> Result<()> {
        let path = self.ruleset_file();
        let json = serde_json::to_string_pretty(ruleset).context("Failed to serialize ruleset")?;
        let content = match &self.sealed {
            Some(sealed) => sealed.seal(json.as_bytes()).context("Failed to seal ruleset")?,
            None => json,
        };
        self.write_text(&path, &content).await
    }
}

#[async_trait::async_trait]
impl FingerprintStore for JsonFileStorage {
    async fn load_fingerprints(&self) -> Result<Vec<String>> {
        Ok(self
            .read_json(&self.fingerprints_file())
            .await?
            .unwrap_or_default())
    }

    async fn save_fingerprints(&self, keys: &[String]) -> Result<()> {
        self.write_json(&self.fingerprints_file(), &keys).await
    }
}

#[async_trait::async_trait]
impl TransactionStore for JsonFileStorage {
    async fn load_transactions(&self) -> Result<Vec<Transaction>> {
        let path = self.transactions_file();
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open transactions file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: Transaction = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse transaction line: {}", line))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_transactions(&self, txns: &[Transaction]) -> Result<()> {
        if txns.is_empty() {
            return Ok(());
        }
        let path = self.transactions_file();
        self.ensure_dir(&path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open transactions file for append")?;

        for txn in txns {
            let line = serde_json::to_string(txn).context("Failed to serialize transaction")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.flush().await.context("Failed to flush transactions file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRule;
    use crate::models::TransactionKind;

    #[tokio::test]
    async fn ruleset_round_trips_plain() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());
        assert!(storage.load_ruleset().await.unwrap().is_none());

        let ruleset = MappingRuleset {
            cards: vec![MappingRule {
                pattern: "3183".to_string(),
                label: Some("SBI Credit Card • 3183".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        storage.save_ruleset(&ruleset).await.unwrap();

        let loaded = storage.load_ruleset().await.unwrap().unwrap();
        assert_eq!(loaded.cards[0].pattern, "3183");
    }

    #[tokio::test]
    async fn sealed_ruleset_requires_the_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let ruleset = MappingRuleset::default();

        let storage = JsonFileStorage::new(dir.path()).with_passphrase("hunter2");
        storage.save_ruleset(&ruleset).await.unwrap();
        assert!(storage.load_ruleset().await.unwrap().is_some());

        let wrong = JsonFileStorage::new(dir.path()).with_passphrase("nope");
        assert!(wrong.load_ruleset().await.is_err());
    }

    #[tokio::test]
    async fn fingerprints_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());
        assert!(storage.load_fingerprints().await.unwrap().is_empty());

        storage
            .save_fingerprints(&["k1".to_string(), "k2".to_string()])
            .await
            .unwrap();
        assert_eq!(
            storage.load_fingerprints().await.unwrap(),
            vec!["k1".to_string(), "k2".to_string()]
        );
    }

    #[tokio::test]
    async fn transactions_append_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());

        let txns = vec![
            Transaction::new("250".parse().unwrap(), TransactionKind::Debit, "ABC STORE"),
            Transaction::new("99".parse().unwrap(), TransactionKind::Credit, "Refund"),
        ];
        storage.append_transactions(&txns).await.unwrap();
        storage.append_transactions(&txns[..1]).await.unwrap();

        let loaded = storage.load_transactions().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].merchant, "Refund");
    }
}
