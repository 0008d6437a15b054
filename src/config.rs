use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dedup::DEFAULT_CAPACITY;
use crate::extract::AmountBounds;

/// Bounds on the configurable amount ceiling. Alerts above the ceiling are
/// treated as extraction noise (balance figures, loan principal).
const MAX_AMOUNT_FLOOR: u64 = 500_000;
const MAX_AMOUNT_CEILING: u64 = 800_000;

fn default_max_amount() -> u64 {
    MAX_AMOUNT_FLOOR
}

fn default_dedup_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Scan/extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Upper sanity bound for extracted amounts, in rupees. Clamped to
    /// [500_000, 800_000].
    pub max_amount: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_amount: default_max_amount(),
        }
    }
}

/// Deduplication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum retained fingerprints; oldest are evicted past this.
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: default_dedup_capacity(),
        }
    }
}

/// Ruleset storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Passphrase sealing the mapping ruleset at rest. Prefer
    /// `passphrase_env` over storing the passphrase in the config file.
    pub passphrase: Option<String>,

    /// Environment variable to read the passphrase from.
    pub passphrase_env: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file
    /// location. If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Scan/extraction settings.
    pub scan: ScanConfig,

    /// Deduplication settings.
    pub dedup: DedupConfig,

    /// Ruleset storage settings.
    pub rules: RulesConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to
    /// `config_dir`. If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths and clamped values.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    /// Scan/extraction settings.
    pub scan: ScanConfig,

    /// Deduplication settings.
    pub dedup: DedupConfig,

    /// Resolved ruleset passphrase, if any.
    pub rules_passphrase: Option<String>,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);
        Self::resolve(config, data_dir)
    }

    /// Load config, creating a default if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Self::resolve(Config::default(), config_dir.to_path_buf())
        }
    }

    fn resolve(mut config: Config, data_dir: PathBuf) -> Result<Self> {
        config.scan.max_amount = config
            .scan
            .max_amount
            .clamp(MAX_AMOUNT_FLOOR, MAX_AMOUNT_CEILING);

        let rules_passphrase = match (&config.rules.passphrase, &config.rules.passphrase_env) {
            (Some(passphrase), _) => Some(passphrase.clone()),
            (None, Some(var)) => Some(
                std::env::var(var)
                    .with_context(|| format!("Failed to read passphrase from ${var}"))?,
            ),
            (None, None) => None,
        };

        Ok(Self {
            data_dir,
            scan: config.scan,
            dedup: config.dedup,
            rules_passphrase,
        })
    }

    /// Amount bounds for the generic extractor, from the clamped ceiling.
    pub fn amount_bounds(&self) -> AmountBounds {
        AmountBounds::new(Decimal::from(self.scan.max_amount))
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./spendscan.toml` if it exists in current directory
/// 2. `~/.local/share/spendscan/spendscan.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("spendscan.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("spendscan").join("spendscan.toml");
    }

    local_config
}
