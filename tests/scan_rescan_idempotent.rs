use std::path::Path;

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use serde_json::json;

use spendscan::clock::FixedClock;
use spendscan::dedup::DedupWindow;
use spendscan::extract::AmountBounds;
use spendscan::pipeline::Pipeline;
use spendscan::scan::{DirMessageSource, Scanner};
use spendscan::storage::{FingerprintStore, JsonFileStorage, TransactionStore};

fn write_message(dir: &Path, id: &str, body: &str, millis: i64) {
    let payload = json!({
        "id": id,
        "from": "alerts@bank.example",
        "subject": "Transaction alert",
        "internalDate": millis,
        "payload": {
            "mimeType": "text/plain",
            "body": { "data": URL_SAFE_NO_PAD.encode(body) },
            "parts": []
        },
        "snippet": ""
    });
    std::fs::write(
        dir.join(format!("{id}.json")),
        serde_json::to_string_pretty(&payload).unwrap(),
    )
    .unwrap();
}

async fn pipeline_with_persisted_state(storage: &JsonFileStorage) -> Result<Pipeline> {
    let mut dedup = DedupWindow::default();
    dedup.load(storage.load_fingerprints().await?);
    Ok(Pipeline::new(AmountBounds::default())
        .with_dedup(dedup)
        .with_clock(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
        )))
}

#[tokio::test]
async fn rescanning_the_same_mailbox_accepts_each_transaction_once() -> Result<()> {
    let data_dir = tempfile::TempDir::new()?;
    let mail_dir = tempfile::TempDir::new()?;
    write_message(
        mail_dir.path(),
        "m1",
        "Rs. 250 spent at ABC STORE using card ending 3183",
        1_704_445_200_000,
    );
    write_message(
        mail_dir.path(),
        "m2",
        "Your OTP is 4821. Do not share. Rs. 500 will be used to verify.",
        1_704_445_260_000,
    );

    let storage = JsonFileStorage::new(data_dir.path());
    let source = DirMessageSource::new(mail_dir.path());

    // First run accepts the debit and drops the OTP notice.
    let mut pipeline = pipeline_with_persisted_state(&storage).await?;
    let outcome = Scanner::new(&mut pipeline, &storage)
        .with_transaction_store(&storage)
        .scan(&source)
        .await?;
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.noise, 1);
    assert_eq!(outcome.accepted[0].merchant, "ABC STORE");

    // Second run over the same mailbox, sharing the fingerprint store,
    // accepts nothing.
    let mut pipeline = pipeline_with_persisted_state(&storage).await?;
    let outcome = Scanner::new(&mut pipeline, &storage)
        .with_transaction_store(&storage)
        .scan(&source)
        .await?;
    assert_eq!(outcome.accepted.len(), 0);
    assert_eq!(outcome.duplicates, 1);

    // Exactly one transaction persisted in total.
    assert_eq!(storage.load_transactions().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn fetch_failure_skips_the_message_but_not_the_scan() -> Result<()> {
    let data_dir = tempfile::TempDir::new()?;
    let mail_dir = tempfile::TempDir::new()?;
    write_message(
        mail_dir.path(),
        "a-good",
        "Rs. 99 spent at CORNER CAFE",
        1_704_445_200_000,
    );
    std::fs::write(mail_dir.path().join("b-broken.json"), "{not json").unwrap();

    let storage = JsonFileStorage::new(data_dir.path());
    let mut pipeline = pipeline_with_persisted_state(&storage).await?;
    let outcome = Scanner::new(&mut pipeline, &storage)
        .scan(&DirMessageSource::new(mail_dir.path()))
        .await?;

    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.fetch_failures, 1);
    Ok(())
}
