use anyhow::Result;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use spendscan::clock::FixedClock;
use spendscan::extract::AmountBounds;
use spendscan::import::read_csv_rows;
use spendscan::mapping::{MappingEngine, MappingRule, MappingRuleset};
use spendscan::models::{Category, TransactionKind, TransactionSource};
use spendscan::pipeline::Pipeline;

fn pipeline() -> Pipeline {
    Pipeline::new(AmountBounds::default()).with_clock(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn csv_rows_flow_through_categorizer_and_mapping() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("statement.csv");
    std::fs::write(
        &path,
        "Date,Amount,Type,Merchant,Card\n\
         2024-01-05,100,credit,Refund,3183\n\
         2024-01-06,450,debit,SWIGGY,3183\n\
         2024-01-07,-200,,Cashback,\n\
         2024-01-08,not-a-number,debit,Broken,\n",
    )?;

    let ruleset = MappingRuleset {
        cards: vec![MappingRule {
            pattern: "3183".to_string(),
            label: Some("SBI Credit Card • 3183".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut pipeline = pipeline().with_mapping(MappingEngine::new(&ruleset));

    let rows = read_csv_rows(&path)?;
    let transactions: Vec<_> = rows.iter().filter_map(|row| pipeline.ingest_row(row)).collect();

    // The unparseable-amount row is rejected; everything else lands.
    assert_eq!(transactions.len(), 3);

    let refund = &transactions[0];
    assert_eq!(refund.amount, "100".parse::<Decimal>().unwrap());
    assert_eq!(refund.kind, TransactionKind::Credit);
    assert_eq!(refund.merchant, "Refund");
    assert_eq!(refund.source, TransactionSource::Import);
    assert_eq!(
        refund.timestamp,
        Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
    );
    assert_eq!(refund.card.as_deref(), Some("SBI Credit Card • 3183"));

    let swiggy = &transactions[1];
    assert_eq!(swiggy.category, Category::Food);
    assert_eq!(swiggy.kind, TransactionKind::Debit);

    // Negative amount with no explicit type is the legacy credit convention.
    let cashback = &transactions[2];
    assert_eq!(cashback.kind, TransactionKind::Credit);
    assert_eq!(cashback.amount, "200".parse::<Decimal>().unwrap());

    Ok(())
}

#[tokio::test]
async fn identical_rows_are_not_deduplicated() -> Result<()> {
    let mut pipeline = pipeline();
    let row: spendscan::import::TabularRow = [
        ("date", "2024-01-05"),
        ("amount", "100"),
        ("type", "credit"),
        ("merchant", "Refund"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    assert!(pipeline.ingest_row(&row).is_some());
    assert!(pipeline.ingest_row(&row).is_some());
    Ok(())
}
