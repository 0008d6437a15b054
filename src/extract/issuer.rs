use regex::Regex;
use rust_decimal::Decimal;

use crate::models::TransactionKind;

use super::fields::FieldExtractor;

/// Fields recovered by an issuer template match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerMatch {
    pub issuer: &'static str,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub card: Option<String>,
    pub merchant: Option<String>,
}

struct IssuerTemplate {
    issuer: &'static str,
    pattern: Regex,
}

/// High-precision template matchers for known bank alert phrasings.
///
/// Templates are tried in a fixed order; the first full match wins and
/// short-circuits the generic extractors, whose looser heuristics could
/// otherwise mis-read merchant or card from structured issuer text.
pub struct IssuerParsers {
    templates: Vec<IssuerTemplate>,
    credit_verb_re: Regex,
}

impl IssuerParsers {
    pub fn new() -> Self {
        // Each template captures amount, and where the phrasing carries
        // them, verb / card / merchant. Order is arbitrary across issuers
        // but deterministic.
        let table: &[(&'static str, &'static str)] = &[
            (
                "SBI",
                r"(?i)Rs\.?\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+(?P<verb>spent|credited)\s+on\s+your\s+SBI\s+(?:Credit\s+|Debit\s+)?Card\s+(?:ending\s+|xx)?(?P<card>\d{4})\s+at\s+(?P<merchant>.+?)\s+on\s",
            ),
            (
                "HDFC",
                r"(?i)(?:Rs\.?|INR)\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+(?:has\s+been\s+)?(?P<verb>debited\s+from|credited\s+to)\s+(?:your\s+)?HDFC\s+Bank\s+A/?c\s+(?:xx|\*+)?(?P<card>\d{3,6})\s+(?:to|from)\s+(?P<merchant>.+?)\s+on\s",
            ),
            (
                "Axis",
                r"(?i)(?:INR|Rs\.?)\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+(?P<verb>debited|credited)\s+(?:from|to)\s+A/?c\s+(?:no\.?\s*)?(?:xx|\*+)?(?P<card>\d{3,6})\s+on\s+\S+.*?\bInfo:?\s*(?:UPI[/-](?:P2[AM][/-])?(?:\d+[/-])?)?(?P<merchant>[^.]+)",
            ),
            (
                "ICICI",
                r"(?i)your\s+ICICI\s+Bank\s+(?:Credit\s+|Debit\s+)?Card\s+(?:xx|\*+)?(?P<card>\d{4})\s+has\s+been\s+used\s+for\s+a\s+transaction\s+of\s+(?:INR|Rs\.?)\s*(?P<amount>[\d,]+(?:\.\d{1,2})?)\s+on\s+\S+(?:\s+\S+)?\s+at\s+(?P<merchant>.+?)(?:\.|$)",
            ),
        ];
        let templates = table
            .iter()
            .map(|(issuer, pattern)| IssuerTemplate {
                issuer,
                pattern: Regex::new(pattern).expect("invalid issuer template"),
            })
            .collect();
        // Past-tense verbs only: product names like "Credit Card" appear in
        // spend alerts and must not read as a credit.
        Self {
            templates,
            credit_verb_re: Regex::new(r"(?i)\b(?:credited|refund(?:ed)?)\b")
                .expect("invalid credit verb regex"),
        }
    }

    /// First matching template, or `None` to fall through to the generic
    /// extractors.
    pub fn parse(&self, text: &str) -> Option<IssuerMatch> {
        for template in &self.templates {
            let Some(caps) = template.pattern.captures(text) else {
                continue;
            };
            let Some(amount) = caps
                .name("amount")
                .and_then(|m| FieldExtractor::parse_amount_token(m.as_str()))
            else {
                continue;
            };
            let kind = match caps.name("verb") {
                Some(verb) if self.credit_verb_re.is_match(verb.as_str()) => {
                    TransactionKind::Credit
                }
                Some(_) => TransactionKind::Debit,
                None => {
                    if self.credit_verb_re.is_match(caps.get(0).map_or("", |m| m.as_str())) {
                        TransactionKind::Credit
                    } else {
                        TransactionKind::Debit
                    }
                }
            };
            return Some(IssuerMatch {
                issuer: template.issuer,
                amount,
                kind,
                card: caps.name("card").map(|m| m.as_str().to_string()),
                merchant: caps
                    .name("merchant")
                    .map(|m| m.as_str().trim().trim_end_matches('.').to_string())
                    .filter(|m| !m.is_empty()),
            });
        }
        None
    }
}

impl Default for IssuerParsers {
    fn default() -> Self {
        Self::new()
    }
}
