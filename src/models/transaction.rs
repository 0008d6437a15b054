use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

use super::{Category, Id};

/// Direction of money movement. Debit is a spend; credit is a refund,
/// reversal, or cashback. The sign of every aggregate comes from this,
/// never from the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Debit,
    Credit,
}

/// Provenance of a record. Never participates in dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Scan,
    Import,
    Demo,
}

/// A canonical transaction record: the source-agnostic shape all display and
/// aggregation code consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    /// Non-negative magnitude in major currency units (rupees).
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub merchant: String,
    /// Last digits, brand name, or a user-relabeled string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    pub category: Category,
    pub source: TransactionSource,
    /// Original normalized text, retained for secondary heuristics and
    /// debugging.
    pub raw: String,
}

impl Transaction {
    pub fn new(amount: Decimal, kind: TransactionKind, merchant: impl Into<String>) -> Self {
        Self::new_with_clock(&SystemClock, amount, kind, merchant)
    }

    pub fn new_with_clock(
        clock: &dyn Clock,
        amount: Decimal,
        kind: TransactionKind,
        merchant: impl Into<String>,
    ) -> Self {
        Self {
            id: Id::generate(),
            timestamp: clock.now(),
            amount: amount.abs(),
            kind,
            merchant: merchant.into(),
            card: None,
            category: Category::Other,
            source: TransactionSource::Scan,
            raw: String::new(),
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_card(mut self, card: impl Into<String>) -> Self {
        self.card = Some(card.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_source(mut self, source: TransactionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Amount signed for aggregation: debits positive, credits negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Debit => self.amount,
            TransactionKind::Credit => -self.amount,
        }
    }
}
