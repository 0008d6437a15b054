use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::fields::FieldExtractor;

/// A detected upcoming bill, surfaced alongside transactions but never
/// counted as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillReminder {
    pub amount: Option<Decimal>,
    pub due_on: Option<String>,
    pub raw: String,
}

fn bill_due_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:bill|statement|payment)\b.{0,80}?\bdue\b(?:\s+(?:on|by))?\s*(?P<date>\d{1,2}[-/\s][A-Za-z0-9]{2,3}[-/\s]\d{2,4})?",
        )
        .expect("invalid bill-due regex")
    })
}

fn amount_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:₹|INR|Rs\.?)\s*(\d[\d,]*(?:\.\d{1,2})?)").expect("invalid amount regex")
    })
}

/// Look for bill-due phrasing in already-normalized text. The amount and due
/// date are optional hints; the phrase alone is enough to raise a reminder.
pub fn detect_bill_due(text: &str) -> Option<BillReminder> {
    let caps = bill_due_re().captures(text)?;
    let due_on = caps.name("date").map(|m| m.as_str().trim().to_string());
    let amount = amount_hint_re()
        .captures(text)
        .and_then(|c| FieldExtractor::parse_amount_token(&c[1]));
    Some(BillReminder {
        amount,
        due_on,
        raw: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bill_with_amount_and_date() {
        let r =
            detect_bill_due("Your credit card bill of Rs. 4,520.00 is due on 15-Jan-2024").unwrap();
        assert_eq!(r.amount, Some("4520.00".parse().unwrap()));
        assert_eq!(r.due_on.as_deref(), Some("15-Jan-2024"));
    }

    #[test]
    fn detects_bill_without_date_or_amount() {
        let r = detect_bill_due("Electricity bill payment is due shortly").unwrap();
        assert_eq!(r.amount, None);
        assert_eq!(r.due_on, None);
    }

    #[test]
    fn plain_debit_alert_is_not_a_bill() {
        assert!(detect_bill_due("Rs. 250 debited at ABC STORE").is_none());
    }
}
