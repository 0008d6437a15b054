use crate::categorize::Categorizer;
use crate::clock::{Clock, SystemClock};
use crate::dedup::{fingerprint, DedupWindow};
use crate::extract::{
    detect_bill_due, message_timestamp, normalized_text, AmountBounds, BillReminder,
    FieldExtractor, IssuerParsers, NoiseFilter, RawMessage,
};
use crate::import::{parse_row, TabularRow};
use crate::mapping::MappingEngine;
use crate::models::{Category, Id, Transaction, TransactionSource};

/// Why a message produced no transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Noise,
    BillDue,
    NoAmount,
    Duplicate,
}

/// Outcome of processing one message.
#[derive(Debug)]
pub enum Processed {
    Accepted(Transaction),
    Rejected(Rejection),
}

impl Processed {
    pub fn into_transaction(self) -> Option<Transaction> {
        match self {
            Processed::Accepted(tx) => Some(tx),
            Processed::Rejected(_) => None,
        }
    }
}

/// The extraction pipeline. Owns all mutable scan state; nothing global.
///
/// Message flow: normalize, noise filter, issuer parsers (first match wins)
/// falling back to the generic extractors, categorize, apply user mappings,
/// dedup. Tabular rows skip extraction and dedup but share the categorize
/// and mapping steps.
pub struct Pipeline {
    noise: NoiseFilter,
    issuers: IssuerParsers,
    fields: FieldExtractor,
    categorizer: Categorizer,
    mapping: MappingEngine,
    dedup: DedupWindow,
    clock: Box<dyn Clock>,
}

impl Pipeline {
    pub fn new(bounds: AmountBounds) -> Self {
        Self {
            noise: NoiseFilter::new(),
            issuers: IssuerParsers::new(),
            fields: FieldExtractor::new(bounds),
            categorizer: Categorizer::new(),
            mapping: MappingEngine::empty(),
            dedup: DedupWindow::default(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_mapping(mut self, mapping: MappingEngine) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupWindow) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn set_mapping(&mut self, mapping: MappingEngine) {
        self.mapping = mapping;
    }

    /// Fingerprints currently held, for persistence after a scan.
    pub fn fingerprints(&self) -> Vec<String> {
        self.dedup.keys()
    }

    /// Run one message through the full pipeline.
    pub fn process_message(&mut self, msg: &RawMessage) -> Processed {
        let text = normalized_text(msg);

        if let Some(rule) = self.noise.rejects(&text) {
            tracing::debug!(id = %msg.id, rule, "message rejected as noise");
            return Processed::Rejected(Rejection::Noise);
        }

        // Bill-due notices carry an amount but describe a future payment,
        // not a spend. They surface as reminders, never as transactions.
        if detect_bill_due(&text).is_some() {
            return Processed::Rejected(Rejection::BillDue);
        }

        let (amount, kind, card, merchant) = match self.issuers.parse(&text) {
            Some(m) => {
                tracing::debug!(id = %msg.id, issuer = m.issuer, "issuer template matched");
                let merchant = m
                    .merchant
                    .unwrap_or_else(|| self.fields.merchant(&text, &msg.from));
                (m.amount, m.kind, m.card, merchant)
            }
            None => {
                let Some(amount) = self.fields.amount(&text) else {
                    return Processed::Rejected(Rejection::NoAmount);
                };
                (
                    amount,
                    self.fields.kind(&text),
                    self.fields.card(&text),
                    self.fields.merchant(&text, &msg.from),
                )
            }
        };

        let mut tx = Transaction::new_with_clock(self.clock.as_ref(), amount, kind, merchant)
            .with_id(Id::from_string(msg.id.clone()))
            .with_timestamp(message_timestamp(msg, self.clock.as_ref()))
            .with_source(TransactionSource::Scan)
            .with_raw(text);
        if let Some(card) = card {
            tx = tx.with_card(card);
        }
        tx.category = self.categorizer.categorize(&tx.merchant, &tx.raw);
        self.mapping.apply(&mut tx);

        if !self.dedup.admit(fingerprint(&tx)) {
            tracing::debug!(id = %msg.id, "duplicate fingerprint, dropped");
            return Processed::Rejected(Rejection::Duplicate);
        }
        Processed::Accepted(tx)
    }

    /// Normalize one tabular row into a transaction. Imports are assumed
    /// authoritative and bypass the deduplicator.
    pub fn ingest_row(&mut self, row: &TabularRow) -> Option<Transaction> {
        let parsed = parse_row(row, self.clock.as_ref())?;

        let mut tx = Transaction::new_with_clock(
            self.clock.as_ref(),
            parsed.amount,
            parsed.kind,
            parsed.merchant,
        )
        .with_timestamp(parsed.timestamp)
        .with_source(TransactionSource::Import)
        .with_raw(String::new());
        if let Some(card) = parsed.card {
            tx = tx.with_card(card);
        }
        tx.category = match parsed.category {
            Some(label) => Category::from(label),
            None => self.categorizer.categorize(&tx.merchant, &tx.raw),
        };
        self.mapping.apply(&mut tx);
        Some(tx)
    }

    /// Secondary heuristic over the retained raw text; never a transaction.
    pub fn bill_reminder(&self, msg: &RawMessage) -> Option<BillReminder> {
        let text = normalized_text(msg);
        if self.noise.is_noise(&text) {
            return None;
        }
        detect_bill_due(&text)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(AmountBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::extract::{MessagePart, PartBody};
    use crate::mapping::{MappingRule, MappingRuleset};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn message(id: &str, body: &str, millis: i64) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            from: "alerts@bank.example".to_string(),
            subject: "Transaction alert".to_string(),
            internal_date: Some(millis),
            payload: Some(MessagePart {
                mime_type: "text/plain".to_string(),
                body: Some(PartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                }),
                parts: Vec::new(),
            }),
            ..Default::default()
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::default().with_clock(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn otp_message_is_rejected_despite_amount() {
        let mut p = pipeline();
        let msg = message(
            "m1",
            "Your OTP is 4821. Do not share. Rs. 500 will be used to verify.",
            1_704_445_200_000,
        );
        assert!(matches!(
            p.process_message(&msg),
            Processed::Rejected(Rejection::Noise)
        ));
    }

    #[test]
    fn issuer_fields_win_over_generic_extraction() {
        let mut p = pipeline();
        // The generic merchant extractor would also bite on "at ..."; the
        // issuer template must supply card and merchant.
        let msg = message(
            "m1",
            "Rs.1,250.50 spent on your SBI Credit Card ending 3183 at ABC STORE on 05-01-24",
            1_704_445_200_000,
        );
        let tx = p.process_message(&msg).into_transaction().unwrap();
        assert_eq!(tx.card.as_deref(), Some("3183"));
        assert_eq!(tx.merchant, "ABC STORE");
        assert_eq!(tx.amount, "1250.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn icici_card_spend_stays_a_debit() {
        let mut p = pipeline();
        let msg = message(
            "m1",
            "Your ICICI Bank Credit Card XX9012 has been used for a transaction of INR 2,499.00 on 05-Jan-24 at AMAZON PAY. Info: online purchase.",
            1_704_445_200_000,
        );
        let tx = p.process_message(&msg).into_transaction().unwrap();
        assert_eq!(tx.kind, crate::models::TransactionKind::Debit);
        assert_eq!(tx.signed_amount(), "2499.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn same_bucket_duplicate_is_dropped_different_bucket_is_kept() {
        let mut p = pipeline();
        let base = 1_704_445_200_000;
        let first = message("m1", "Rs. 250 spent at ABC STORE", base);
        let two_min = message("m2", "Rs. 250 spent at ABC STORE", base + 2 * 60_000);
        let fifteen_min = message("m3", "Rs. 250 spent at ABC STORE", base + 15 * 60_000);

        assert!(p.process_message(&first).into_transaction().is_some());
        assert!(matches!(
            p.process_message(&two_min),
            Processed::Rejected(Rejection::Duplicate)
        ));
        assert!(p.process_message(&fifteen_min).into_transaction().is_some());
    }

    #[test]
    fn mapping_rules_rewrite_cards_after_extraction() {
        let ruleset = MappingRuleset {
            cards: vec![MappingRule {
                pattern: "3183".to_string(),
                label: Some("SBI Credit Card • 3183".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut p = pipeline().with_mapping(MappingEngine::new(&ruleset));
        let msg = message(
            "m1",
            "Rs. 250 spent using card ending 3183 at ABC STORE",
            1_704_445_200_000,
        );
        let tx = p.process_message(&msg).into_transaction().unwrap();
        assert_eq!(tx.card.as_deref(), Some("SBI Credit Card • 3183"));
    }

    #[test]
    fn row_import_shares_categorizer_and_skips_dedup() {
        let mut p = pipeline();
        let row: TabularRow = [
            ("date", "2024-01-05"),
            ("amount", "100"),
            ("type", "credit"),
            ("merchant", "Refund"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let first = p.ingest_row(&row).unwrap();
        let second = p.ingest_row(&row).unwrap();
        assert_eq!(first.amount, "100".parse::<Decimal>().unwrap());
        assert_eq!(first.source, TransactionSource::Import);
        assert_eq!(second.merchant, "Refund");
    }

    #[test]
    fn message_without_amount_is_rejected() {
        let mut p = pipeline();
        let msg = message("m1", "Thanks for visiting our branch today", 1_704_445_200_000);
        assert!(matches!(
            p.process_message(&msg),
            Processed::Rejected(Rejection::NoAmount)
        ));
    }
}
