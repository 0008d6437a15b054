use regex::Regex;
use rust_decimal::Decimal;

use crate::models::TransactionKind;

/// Sane magnitude window for extracted amounts, in rupees.
#[derive(Debug, Clone)]
pub struct AmountBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountBounds {
    pub fn new(max: Decimal) -> Self {
        Self {
            min: Decimal::ONE,
            max,
        }
    }

    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self::new(Decimal::from(500_000u32))
    }
}

/// Well-known brand literals tried when no "at/to MERCHANT" phrase matches.
const BRAND_LITERALS: &[(&str, &str)] = &[
    ("amazon", "Amazon"),
    ("flipkart", "Flipkart"),
    ("swiggy", "Swiggy"),
    ("zomato", "Zomato"),
    ("myntra", "Myntra"),
    ("bigbasket", "BigBasket"),
    ("irctc", "IRCTC"),
    ("uber", "Uber"),
    ("ola", "Ola"),
    ("netflix", "Netflix"),
    ("paytm", "Paytm"),
    ("phonepe", "PhonePe"),
];

/// Generic best-effort field extractors, used when no issuer template
/// matches. Each extractor is independent; only a failed amount extraction
/// disqualifies a message.
pub struct FieldExtractor {
    bounds: AmountBounds,
    amount_re: Regex,
    credit_re: Regex,
    merchant_re: Regex,
    account_re: Regex,
    card_re: Regex,
    brand_card_re: Regex,
}

impl FieldExtractor {
    pub fn new(bounds: AmountBounds) -> Self {
        Self {
            bounds,
            // Currency marker directly adjacent to a decimal number.
            amount_re: Regex::new(r"(?i)(?:₹|INR|Rs\.?)\s*(\d[\d,]*(?:\.\d{1,2})?)")
                .expect("invalid amount regex"),
            credit_re: Regex::new(
                r"(?i)\b(?:credited|credit|refund(?:ed)?|cash\s?back|revers(?:ed|al))\b",
            )
            .expect("invalid credit regex"),
            // "at/to/via/towards/merchant:" followed by an uppercase-ish
            // token run.
            merchant_re: Regex::new(
                r"\b(?i:at|to|via|towards|merchant:?)\s+([A-Z][A-Z0-9@&.'\-]*(?:\s+[A-Z0-9][A-Z0-9@&.'\-]*){0,4})",
            )
            .expect("invalid merchant regex"),
            // Bank-account identifiers outrank generic card patterns.
            account_re: Regex::new(
                r"(?i)\b(?:a/?c|acct|account)(?:\s*(?:no|number)\.?)?\s*(?:ending\s*(?:in\s*)?|x+|\*+)?\s*(\d{3,6})\b",
            )
            .expect("invalid account regex"),
            card_re: Regex::new(
                r"(?i)\b(?:card(?:\s*(?:no|number)\.?)?|ending(?:\s+in)?|xx)\s*:?\s*(\d{4})\b",
            )
            .expect("invalid card regex"),
            brand_card_re: Regex::new(r"(?i)\b(visa|master\s?card|rupay|amex|american\s+express)\b")
                .expect("invalid card brand regex"),
        }
    }

    pub fn bounds(&self) -> &AmountBounds {
        &self.bounds
    }

    /// Parse a rupee figure out of a matched numeric token.
    pub fn parse_amount_token(token: &str) -> Option<Decimal> {
        token.replace(',', "").parse::<Decimal>().ok()
    }

    /// First currency-anchored number in the text; `None` if absent or
    /// outside the sane magnitude window.
    pub fn amount(&self, text: &str) -> Option<Decimal> {
        let caps = self.amount_re.captures(text)?;
        let amount = Self::parse_amount_token(caps.get(1)?.as_str())?;
        self.bounds.contains(amount).then_some(amount)
    }

    /// Credit keywords win; everything else is a debit. The default biases
    /// toward counting, so an unlabeled spend is recorded rather than
    /// silently dropped.
    pub fn kind(&self, text: &str) -> TransactionKind {
        if self.credit_re.is_match(text) {
            TransactionKind::Credit
        } else {
            TransactionKind::Debit
        }
    }

    /// Merchant fallback chain: "at/to/..." phrase, brand literal, sender
    /// identity, literal "Unknown".
    pub fn merchant(&self, text: &str, sender: &str) -> String {
        if let Some(caps) = self.merchant_re.captures(text) {
            let captured = caps[1].trim_end_matches(['.', ',', ';']).trim();
            if captured.len() >= 2 {
                return captured.to_string();
            }
        }

        let lower = text.to_lowercase();
        for (needle, label) in BRAND_LITERALS {
            if lower.contains(needle) {
                return (*label).to_string();
            }
        }

        if let Some(name) = sender_label(sender) {
            return name;
        }

        "Unknown".to_string()
    }

    /// Card fallback chain: account number, card tail, brand literal.
    pub fn card(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.account_re.captures(text) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = self.card_re.captures(text) {
            return Some(caps[1].to_string());
        }
        self.brand_card_re
            .captures(text)
            .map(|caps| canonical_brand(&caps[1]))
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(AmountBounds::default())
    }
}

fn canonical_brand(raw: &str) -> String {
    match raw.to_lowercase().replace(char::is_whitespace, "").as_str() {
        "visa" => "Visa".to_string(),
        "mastercard" => "Mastercard".to_string(),
        "rupay" => "RuPay".to_string(),
        _ => "Amex".to_string(),
    }
}

/// Display name from a `From` header, else the sender domain.
fn sender_label(sender: &str) -> Option<String> {
    let sender = sender.trim();
    if sender.is_empty() {
        return None;
    }
    if let Some((name, _)) = sender.split_once('<') {
        let name = name.trim().trim_matches('"').trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    let addr = sender.trim_matches(['<', '>']);
    addr.split_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>').to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::default()
    }

    #[test]
    fn amount_requires_currency_marker() {
        let ex = extractor();
        assert_eq!(
            ex.amount("Rs. 1,250.50 spent"),
            Some("1250.50".parse().unwrap())
        );
        assert_eq!(ex.amount("INR 99 debited"), Some("99".parse().unwrap()));
        assert_eq!(ex.amount("₹450 at STORE"), Some("450".parse().unwrap()));
        assert_eq!(ex.amount("1250.50 spent with no marker"), None);
    }

    #[test]
    fn amount_outside_bounds_is_rejected() {
        let ex = extractor();
        assert_eq!(ex.amount("Rs. 0.50 charged"), None);
        assert_eq!(ex.amount("Rs. 9,00,000 transferred"), None);
    }

    #[test]
    fn first_amount_candidate_wins() {
        let ex = extractor();
        assert_eq!(
            ex.amount("Rs. 250 debited. Avl bal Rs. 10,000"),
            Some("250".parse().unwrap())
        );
    }

    #[test]
    fn kind_defaults_to_debit_without_keywords() {
        let ex = extractor();
        assert_eq!(ex.kind("Rs. 250, ABC STORE"), TransactionKind::Debit);
        assert_eq!(ex.kind("Rs. 250 debited"), TransactionKind::Debit);
        assert_eq!(ex.kind("Rs. 250 refunded"), TransactionKind::Credit);
        assert_eq!(ex.kind("cashback of Rs. 50 credited"), TransactionKind::Credit);
    }

    #[test]
    fn merchant_prefers_at_phrase_over_brand_and_sender() {
        let ex = extractor();
        assert_eq!(
            ex.merchant("Rs. 250 spent at ABC STORE on 05-01", "alerts@amazon.in"),
            "ABC STORE"
        );
        assert_eq!(
            ex.merchant("your amazon order payment of Rs. 999", "noreply@bank.com"),
            "Amazon"
        );
        assert_eq!(
            ex.merchant("payment received", "HDFC Bank <alerts@hdfcbank.net>"),
            "HDFC Bank"
        );
        assert_eq!(
            ex.merchant("payment received", "alerts@hdfcbank.net"),
            "hdfcbank.net"
        );
        assert_eq!(ex.merchant("payment received", ""), "Unknown");
    }

    #[test]
    fn account_number_outranks_card_tail() {
        let ex = extractor();
        assert_eq!(
            ex.card("A/c no. 30446 debited, card ending 9012 used"),
            Some("30446".to_string())
        );
        assert_eq!(ex.card("card ending 9012 used"), Some("9012".to_string()));
        assert_eq!(ex.card("your Visa was charged"), Some("Visa".to_string()));
        assert_eq!(ex.card("no identifiers here"), None);
    }
}
