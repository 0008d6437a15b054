use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spendscan::config::{default_config_path, ResolvedConfig};
use spendscan::dedup::DedupWindow;
use spendscan::import::{read_csv_rows, read_xlsx_rows};
use spendscan::mapping::{MappingEngine, MappingRuleset};
use spendscan::models::Transaction;
use spendscan::pipeline::Pipeline;
use spendscan::scan::{DirMessageSource, Scanner};
use spendscan::storage::{FingerprintStore, JsonFileStorage, RulesetStore, TransactionStore};
use spendscan::summary::{format_inr, summarize};

#[derive(Parser)]
#[command(name = "spendscan")]
#[command(about = "Transaction extraction from bank alert mail and statements")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory of exported alert messages (one JSON file each)
    Scan {
        /// Directory of message JSON files
        dir: PathBuf,
    },
    /// Import transactions from a CSV or XLSX file
    Import {
        /// Statement file (.csv, .xlsx, .xls, .ods)
        file: PathBuf,
    },
    /// Manage the user mapping ruleset
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Run the pipeline over built-in sample alerts
    Demo,
    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Replace the stored ruleset with the given JSON file
    Import {
        /// Ruleset JSON file
        file: PathBuf,
    },
    /// Print the stored ruleset as JSON
    Export,
}

fn storage_for(config: &ResolvedConfig) -> JsonFileStorage {
    let storage = JsonFileStorage::new(&config.data_dir);
    match &config.rules_passphrase {
        Some(passphrase) => storage.with_passphrase(passphrase),
        None => storage,
    }
}

/// Ruleset load failures are reported but never block a scan; the pipeline
/// proceeds with an empty ruleset.
async fn load_mapping(storage: &JsonFileStorage) -> MappingEngine {
    match storage.load_ruleset().await {
        Ok(Some(ruleset)) => MappingEngine::new(&ruleset),
        Ok(None) => MappingEngine::empty(),
        Err(err) => {
            tracing::error!(%err, "failed to load mapping ruleset, continuing without it");
            MappingEngine::empty()
        }
    }
}

async fn build_pipeline(config: &ResolvedConfig, storage: &JsonFileStorage) -> Result<Pipeline> {
    let mut dedup = DedupWindow::new(config.dedup.capacity);
    dedup.load(storage.load_fingerprints().await?);

    Ok(Pipeline::new(config.amount_bounds())
        .with_mapping(load_mapping(storage).await)
        .with_dedup(dedup))
}

fn print_transactions(transactions: &[Transaction]) {
    for tx in transactions {
        println!(
            "{}  {:>14}  {:<14} {:<24} {}",
            tx.timestamp.format("%Y-%m-%d %H:%M"),
            format_inr(tx.signed_amount()),
            tx.category.as_str(),
            tx.merchant,
            tx.card.as_deref().unwrap_or("-"),
        );
    }

    let summary = summarize(transactions);
    println!();
    println!("{} transaction(s), net {}", summary.count, format_inr(summary.net_total));
    for (category, total) in &summary.by_category {
        println!("  {category:<16} {}", format_inr(*total));
    }
}

async fn run_scan(config: &ResolvedConfig, dir: PathBuf) -> Result<()> {
    let storage = storage_for(config);
    let mut pipeline = build_pipeline(config, &storage).await?;
    let source = DirMessageSource::new(dir);

    let mut scanner =
        Scanner::new(&mut pipeline, &storage).with_transaction_store(&storage);
    let outcome = scanner.scan(&source).await?;

    print_transactions(&outcome.accepted);
    if !outcome.reminders.is_empty() {
        println!();
        for reminder in &outcome.reminders {
            let amount = reminder
                .amount
                .map(format_inr)
                .unwrap_or_else(|| "?".to_string());
            let due = reminder.due_on.as_deref().unwrap_or("unknown date");
            println!("Bill due {due}: {amount}");
        }
    }
    if outcome.noise + outcome.no_amount + outcome.duplicates + outcome.fetch_failures > 0 {
        println!(
            "Skipped: {} noise, {} without amount, {} duplicates, {} fetch failures",
            outcome.noise, outcome.no_amount, outcome.duplicates, outcome.fetch_failures
        );
    }
    Ok(())
}

async fn run_import(config: &ResolvedConfig, file: PathBuf) -> Result<()> {
    let storage = storage_for(config);
    let mut pipeline = build_pipeline(config, &storage).await?;

    let is_csv = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let rows = if is_csv {
        read_csv_rows(&file)?
    } else {
        read_xlsx_rows(&file)?
    };

    let mut accepted = Vec::new();
    let mut rejected = 0usize;
    for row in &rows {
        match pipeline.ingest_row(row) {
            Some(tx) => accepted.push(tx),
            None => rejected += 1,
        }
    }
    storage.append_transactions(&accepted).await?;

    print_transactions(&accepted);
    if rejected > 0 {
        println!("Rejected {rejected} row(s) without a usable amount");
    }
    Ok(())
}

async fn run_rules(config: &ResolvedConfig, command: RulesCommand) -> Result<()> {
    let storage = storage_for(config);
    match command {
        RulesCommand::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read ruleset file {}", file.display()))?;
            let ruleset: MappingRuleset = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse ruleset JSON {}", file.display()))?;
            storage.save_ruleset(&ruleset).await?;
            println!(
                "Imported {} card, {} account, {} merchant, {} category rule(s)",
                ruleset.cards.len(),
                ruleset.accounts.len(),
                ruleset.merchant_rules.len(),
                ruleset.category_rules.len()
            );
        }
        RulesCommand::Export => {
            let ruleset = storage.load_ruleset().await?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&ruleset)?);
        }
    }
    Ok(())
}

async fn run_demo(config: &ResolvedConfig) -> Result<()> {
    let storage = storage_for(config);
    let mut pipeline = Pipeline::new(config.amount_bounds())
        .with_mapping(load_mapping(&storage).await);

    let mut accepted = Vec::new();
    for msg in spendscan::demo::sample_messages() {
        if let Some(mut tx) = pipeline.process_message(&msg).into_transaction() {
            tx.source = spendscan::models::TransactionSource::Demo;
            accepted.push(tx);
        }
    }
    print_transactions(&accepted);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    match cli.command {
        Command::Scan { dir } => run_scan(&config, dir).await,
        Command::Import { file } => run_import(&config, file).await,
        Command::Rules { command } => run_rules(&config, command).await,
        Command::Demo => run_demo(&config).await,
        Command::Config => {
            println!("Config file: {}", config_path.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Max amount: {}", config.scan.max_amount);
            println!("Dedup capacity: {}", config.dedup.capacity);
            println!(
                "Ruleset sealing: {}",
                if config.rules_passphrase.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            Ok(())
        }
    }
}
