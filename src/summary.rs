use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Transaction;

/// Aggregated view over a set of accepted transactions. Credits subtract
/// from debit totals; the sign comes from `kind`, never from the amount.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpendingSummary {
    pub net_total: Decimal,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    pub by_category: BTreeMap<String, Decimal>,
    pub by_month: BTreeMap<String, Decimal>,
    pub count: usize,
}

pub fn summarize(transactions: &[Transaction]) -> SpendingSummary {
    let mut summary = SpendingSummary {
        count: transactions.len(),
        ..Default::default()
    };
    for tx in transactions {
        let signed = tx.signed_amount();
        summary.net_total += signed;
        if signed.is_sign_negative() {
            summary.credit_total += tx.amount;
        } else {
            summary.debit_total += tx.amount;
        }
        *summary
            .by_category
            .entry(tx.category.as_str().to_string())
            .or_default() += signed;
        *summary
            .by_month
            .entry(tx.timestamp.format("%Y-%m").to_string())
            .or_default() += signed;
    }
    summary
}

/// Indian-style digit grouping: the last three digits, then pairs.
/// 1234567.5 formats as "12,34,567.50".
fn group_indian_digits(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 2);
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len - i - 1;
        if remaining >= 3 && (remaining - 3) % 2 == 0 {
            out.push(',');
        }
    }
    out
}

/// Format a rupee amount for human display: ₹ prefix, two fixed decimal
/// places, Indian grouping, sign before the symbol.
pub fn format_inr(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();

    let s = format!("{:.2}", abs);
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let grouped = group_indian_digits(int_part);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('₹');
    out.push_str(&grouped);
    out.push('.');
    out.push_str(frac_part);
    out
}
