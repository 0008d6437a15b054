use regex::Regex;

use crate::models::Category;

/// One keyword rule in the ordered table.
struct CategoryRule {
    name: &'static str,
    pattern: Regex,
    category: Category,
}

/// Ordered first-match-wins keyword categorizer.
///
/// Order matters: "utilities" and "shopping" share vocabulary ("store",
/// "recharge"), so the specific utility rules shadow the broader shopping
/// rule. The table is data so the precedence is visible and testable.
/// User-authored category overrides are not this type's concern; they are
/// applied afterwards by the mapping engine's category rule group.
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Categorizer {
    pub fn new() -> Self {
        let table: &[(&'static str, &'static str, Category)] = &[
            (
                "fuel",
                r"(?i)\b(?:petrol|diesel|fuel|hpcl|bpcl|iocl|indian\s?oil|shell)\b",
                Category::Fuel,
            ),
            (
                "utilities-electric",
                r"(?i)\b(?:electric(?:ity)?|power\s+bill|bescom|msedcl|tneb|bses)\b",
                Category::Utilities,
            ),
            (
                "utilities-broadband",
                r"(?i)\b(?:broadband|fiber|wifi|act\s?fibernet|jiofiber|airtel\s?xstream)\b",
                Category::Utilities,
            ),
            (
                "utilities-mobile",
                r"(?i)\b(?:recharge|prepaid|postpaid|mobile\s+bill|jio|airtel|vi|vodafone)\b",
                Category::Utilities,
            ),
            (
                "utilities-gas",
                r"(?i)\b(?:lpg|cylinder|piped\s+gas|indane|mahanagar\s+gas|igl)\b",
                Category::Utilities,
            ),
            (
                "utilities-water",
                r"(?i)\b(?:water\s+(?:bill|supply|board)|bwssb|jal\s+board)\b",
                Category::Utilities,
            ),
            (
                "tolls",
                r"(?i)\b(?:toll|fastag|nhai)\b",
                Category::Tolls,
            ),
            (
                "travel",
                r"(?i)\b(?:irctc|railway|flight|airline|indigo|vistara|air\s?india|uber|ola|rapido|redbus|makemytrip|goibibo|hotel)\b",
                Category::Travel,
            ),
            (
                "shopping",
                r"(?i)\b(?:amazon|flipkart|myntra|ajio|store|mart|bazaar|shopping|bigbasket|blinkit|zepto)\b",
                Category::Shopping,
            ),
            (
                "subscriptions",
                r"(?i)\b(?:netflix|prime\s?video|hotstar|spotify|subscription|renewal|membership)\b",
                Category::Subscriptions,
            ),
            (
                "transfers",
                r"(?i)\b(?:upi|imps|neft|rtgs|transfer(?:red)?|sent\s+to|vpa)\b",
                Category::Transfers,
            ),
            (
                "food",
                r"(?i)\b(?:swiggy|zomato|restaurant|cafe|food|dining|eatery|dominos|mcdonald)\b",
                Category::Food,
            ),
        ];
        let rules = table
            .iter()
            .map(|(name, pattern, category)| CategoryRule {
                name,
                pattern: Regex::new(pattern).expect("invalid category pattern"),
                category: category.clone(),
            })
            .collect();
        Self { rules }
    }

    /// First matching rule over merchant then raw text; no match is `Other`.
    pub fn categorize(&self, merchant: &str, raw: &str) -> Category {
        for rule in &self.rules {
            if rule.pattern.is_match(merchant) || rule.pattern.is_match(raw) {
                tracing::trace!(rule = rule.name, "category rule matched");
                return rule.category.clone();
            }
        }
        Category::Other
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}
