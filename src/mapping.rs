use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::models::{Category, Transaction};

/// One user-authored override rule. `pattern` is a regular expression;
/// which replacement fields apply depends on the group the rule sits in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingRule {
    #[serde(alias = "match")]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// The four ordered rule lists a user supplies. Replaced wholesale on
/// import; last import wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingRuleset {
    #[serde(default)]
    pub cards: Vec<MappingRule>,
    #[serde(default)]
    pub accounts: Vec<MappingRule>,
    #[serde(default, rename = "merchantRules")]
    pub merchant_rules: Vec<MappingRule>,
    #[serde(default, rename = "categoryRules")]
    pub category_rules: Vec<MappingRule>,
}

struct CompiledRule {
    pattern: regex::Regex,
    label: Option<String>,
    merchant: Option<String>,
    category: Option<Category>,
}

/// Applies a compiled ruleset to transactions.
///
/// Within each group the first matching rule wins; groups run in a fixed
/// order (cards, accounts, merchants, categories) so a later group can still
/// override a category set by an earlier one. A malformed pattern is logged
/// and skipped; it never aborts the scan of the remaining rules.
pub struct MappingEngine {
    cards: Vec<CompiledRule>,
    accounts: Vec<CompiledRule>,
    merchants: Vec<CompiledRule>,
    categories: Vec<CompiledRule>,
}

impl MappingEngine {
    pub fn new(ruleset: &MappingRuleset) -> Self {
        Self {
            cards: compile_group("cards", &ruleset.cards),
            accounts: compile_group("accounts", &ruleset.accounts),
            merchants: compile_group("merchantRules", &ruleset.merchant_rules),
            categories: compile_group("categoryRules", &ruleset.category_rules),
        }
    }

    pub fn empty() -> Self {
        Self::new(&MappingRuleset::default())
    }

    /// Rewrite card/merchant/category fields in place per the active rules.
    pub fn apply(&self, tx: &mut Transaction) {
        // Card and account rules both relabel the card field; accounts get
        // their own group so bank-account patterns can be managed apart
        // from card patterns.
        for group in [&self.cards, &self.accounts] {
            if let Some(rule) = group.iter().find(|r| {
                r.pattern.is_match(&tx.raw)
                    || tx.card.as_deref().is_some_and(|c| r.pattern.is_match(c))
            }) {
                if let Some(label) = &rule.label {
                    tx.card = Some(label.clone());
                }
            }
        }

        if let Some(rule) = self.merchants.iter().find(|r| {
            r.pattern.is_match(&tx.raw) || r.pattern.is_match(&tx.merchant)
        }) {
            if let Some(merchant) = &rule.merchant {
                tx.merchant = merchant.clone();
            }
            if let Some(category) = &rule.category {
                tx.category = category.clone();
            }
        }

        if let Some(rule) = self.categories.iter().find(|r| {
            r.pattern.is_match(&tx.raw) || r.pattern.is_match(&tx.merchant)
        }) {
            if let Some(category) = &rule.category {
                tx.category = category.clone();
            }
        }
    }
}

fn compile_group(group: &str, rules: &[MappingRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .filter_map(|rule| {
            let pattern = match RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(re) => re,
                Err(err) => {
                    tracing::warn!(group, pattern = %rule.pattern, %err, "skipping invalid mapping rule");
                    return None;
                }
            };
            Some(CompiledRule {
                pattern,
                label: rule.label.clone(),
                merchant: rule.merchant.clone(),
                category: rule.category.as_deref().map(Category::from),
            })
        })
        .collect()
}
