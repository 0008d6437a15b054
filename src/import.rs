use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::models::TransactionKind;

/// One loosely-cased key→value row from a CSV or spreadsheet.
pub type TabularRow = HashMap<String, String>;

/// Canonical fields recognized in imported rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Amount,
    Kind,
    Merchant,
    Card,
    Category,
}

/// Declarative alias table consumed by one generic resolver, instead of
/// per-field fallback chains.
const COLUMN_ALIASES: &[(Column, &[&str])] = &[
    (Column::Date, &["date", "txn date", "transaction date", "value date"]),
    (Column::Amount, &["amount", "amt", "value", "transaction amount"]),
    (Column::Kind, &["type", "txn type", "dr/cr", "debit/credit"]),
    (
        Column::Merchant,
        &["merchant", "payee", "description", "narration", "details"],
    ),
    (Column::Card, &["card", "account", "a/c", "card no", "account no"]),
    (Column::Category, &["category", "tag", "label"]),
];

fn lookup(row: &TabularRow, column: Column) -> Option<&str> {
    let aliases = COLUMN_ALIASES
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, aliases)| *aliases)?;
    for alias in aliases {
        if let Some((_, value)) = row
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(alias))
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// A row normalized far enough to build a transaction from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub timestamp: DateTime<Utc>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub merchant: String,
    pub card: Option<String>,
    pub category: Option<String>,
}

/// Strip currency markers and grouping commas from an amount cell.
fn parse_amount_cell(cell: &str) -> Option<Decimal> {
    let cleaned = cell
        .trim()
        .trim_start_matches(['₹'])
        .trim_start_matches("Rs.")
        .trim_start_matches("Rs")
        .trim_start_matches("INR")
        .trim()
        .replace(',', "");
    cleaned.parse::<Decimal>().ok()
}

fn parse_date_cell(cell: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(cell) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%d-%m-%Y %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(cell, format) {
            return Utc.from_local_datetime(&parsed).single();
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d %b %Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(cell, format) {
            return Utc
                .from_local_datetime(&parsed.and_hms_opt(0, 0, 0)?)
                .single();
        }
    }
    None
}

/// Normalize one row, or `None` if it cannot represent a transaction.
///
/// An unparseable or missing amount rejects the row; an unparseable date
/// coerces to the ingestion clock. A negative amount is the legacy credit
/// convention and normalizes to `{abs(amount), Credit}` unless an explicit
/// type column says otherwise.
pub fn parse_row(row: &TabularRow, clock: &dyn Clock) -> Option<ParsedRow> {
    let amount = parse_amount_cell(lookup(row, Column::Amount)?)?;
    if amount.is_zero() {
        return None;
    }

    let kind = match lookup(row, Column::Kind) {
        Some(kind_cell) => {
            let lowered = kind_cell.to_lowercase();
            if lowered.contains("credit") || lowered.contains("cr") {
                TransactionKind::Credit
            } else {
                TransactionKind::Debit
            }
        }
        None if amount.is_sign_negative() => TransactionKind::Credit,
        None => TransactionKind::Debit,
    };

    let timestamp = lookup(row, Column::Date)
        .and_then(parse_date_cell)
        .unwrap_or_else(|| clock.now());

    Some(ParsedRow {
        timestamp,
        amount: amount.abs(),
        kind,
        merchant: lookup(row, Column::Merchant)
            .unwrap_or("Unknown")
            .to_string(),
        card: lookup(row, Column::Card).map(str::to_string),
        category: lookup(row, Column::Category).map(str::to_string),
    })
}

/// Read all rows of a CSV file keyed by its header line.
pub fn read_csv_rows(path: impl AsRef<Path>) -> Result<Vec<TabularRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {:?}", path))?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<TabularRow>() {
        let row = result.with_context(|| format!("Failed to read CSV row in {:?}", path))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read all rows of the first sheet of an XLSX/ODS workbook, keyed by the
/// first row's cell values.
pub fn read_xlsx_rows(path: impl AsRef<Path>) -> Result<Vec<TabularRow>> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {:?}", path))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no sheets")?
        .with_context(|| format!("Failed to read first sheet of {:?}", path))?;

    let mut iter = range.rows();
    let Some(header) = iter.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();

    let rows = iter
        .map(|cells| {
            headers
                .iter()
                .zip(cells.iter())
                .map(|(key, cell)| (key.clone(), cell.to_string()))
                .collect::<TabularRow>()
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn row(pairs: &[(&str, &str)]) -> TabularRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolves_loosely_cased_columns() {
        let parsed = parse_row(
            &row(&[
                ("Date", "2024-01-05"),
                ("AMOUNT", "100"),
                ("Type", "credit"),
                ("Merchant", "Refund"),
            ]),
            &clock(),
        )
        .unwrap();

        assert_eq!(parsed.amount, "100".parse::<Decimal>().unwrap());
        assert_eq!(parsed.kind, TransactionKind::Credit);
        assert_eq!(parsed.merchant, "Refund");
        assert_eq!(
            parsed.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn negative_amount_without_type_is_a_credit() {
        let parsed = parse_row(
            &row(&[("date", "2024-01-05"), ("amount", "-250.00"), ("payee", "Cashback")]),
            &clock(),
        )
        .unwrap();
        assert_eq!(parsed.kind, TransactionKind::Credit);
        assert_eq!(parsed.amount, "250.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn unparseable_amount_rejects_the_row() {
        assert!(parse_row(&row(&[("amount", "NaN"), ("merchant", "X")]), &clock()).is_none());
        assert!(parse_row(&row(&[("merchant", "X")]), &clock()).is_none());
        assert!(parse_row(&row(&[("amount", "0")]), &clock()).is_none());
    }

    #[test]
    fn bad_date_coerces_to_ingestion_time() {
        let c = clock();
        let parsed = parse_row(&row(&[("date", "soonish"), ("amount", "10")]), &c).unwrap();
        assert_eq!(parsed.timestamp, c.now());
    }

    #[test]
    fn currency_markers_in_amount_cells_are_tolerated() {
        let parsed = parse_row(&row(&[("amount", "₹1,250.50")]), &clock()).unwrap();
        assert_eq!(parsed.amount, "1250.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn csv_rows_round_trip_through_the_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.csv");
        std::fs::write(&path, "Date,Amount,Type,Merchant\n2024-01-05,100,credit,Refund\n").unwrap();

        let rows = read_csv_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        let parsed = parse_row(&rows[0], &clock()).unwrap();
        assert_eq!(parsed.merchant, "Refund");
        assert_eq!(parsed.kind, TransactionKind::Credit);
    }
}
