//! Raw transaction normalization and merchant key extraction
//!
//! Raw rows arrive as loosely shaped JSON objects whose field names vary by
//! source (banks, exports, manual entry). Normalization never fails: missing
//! or malformed fields degrade to defaults, and unusable rows are filtered
//! out later rather than raising errors.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::models::{Direction, NormalizedTransaction};

/// Sentinel grouping key for rows whose merchant text is unusable
pub const UNKNOWN_KEY: &str = "unknown";

// Field aliases, tried in order, when reading a raw row.
const ID_FIELDS: &[&str] = &["id", "transaction_id", "transactionId", "tx_id"];
const DATE_FIELDS: &[&str] = &[
    "date",
    "transaction_date",
    "transactionDate",
    "posted_date",
    "postedDate",
    "post_date",
    "timestamp",
];
const AMOUNT_FIELDS: &[&str] = &[
    "amount",
    "transaction_amount",
    "transactionAmount",
    "value",
    "debit",
];
const TYPE_FIELDS: &[&str] = &[
    "type",
    "transaction_type",
    "transactionType",
    "direction",
    "credit_debit",
];
const MERCHANT_FIELDS: &[&str] = &[
    "merchant",
    "merchant_name",
    "merchantName",
    "payee",
    "vendor",
    "name",
];
const DESCRIPTION_FIELDS: &[&str] = &["description", "memo", "details", "narrative"];
const CATEGORY_FIELDS: &[&str] = &[
    "category",
    "category_name",
    "categoryName",
    "personal_finance_category",
];

const INCOME_WORDS: &[&str] = &["income", "credit", "deposit"];
const EXPENSE_WORDS: &[&str] = &["expense", "debit", "withdrawal", "payment"];

/// Convert one raw row into the canonical transaction shape.
///
/// `index` seeds the fallback id for rows that carry none.
pub fn normalize_transaction(raw: &Value, index: usize) -> NormalizedTransaction {
    let id = first_string(raw, ID_FIELDS)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("txn-{}", index));

    let date = first_string(raw, DATE_FIELDS).and_then(|s| parse_date(&s));

    let signed_amount = first_value(raw, AMOUNT_FIELDS)
        .map(coerce_amount)
        .unwrap_or(0.0);

    let type_field = first_string(raw, TYPE_FIELDS);
    let direction = resolve_direction(type_field.as_deref(), signed_amount);
    let amount = signed_amount.abs();

    let merchant_raw = first_string(raw, MERCHANT_FIELDS)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let description = first_string(raw, DESCRIPTION_FIELDS)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let merchant = if !merchant_raw.is_empty() {
        merchant_raw.clone()
    } else if !description.is_empty() {
        description.clone()
    } else {
        "Unknown".to_string()
    };

    let key_source = if !merchant_raw.is_empty() {
        &merchant_raw
    } else {
        &description
    };
    let merchant_key = extract_merchant_key(key_source);

    let category = first_string(raw, CATEGORY_FIELDS)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    NormalizedTransaction {
        id,
        date,
        amount,
        direction,
        merchant,
        description,
        merchant_key,
        category,
    }
}

/// Parse a date string in various common formats
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // ISO datetime (e.g. 2024-01-15T09:30:00Z)
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Coerce a JSON amount value to a float, defaulting to 0 on garbage
fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Resolve direction from an explicit type field, falling back to the
/// sign of the amount
fn resolve_direction(type_field: Option<&str>, signed_amount: f64) -> Direction {
    if let Some(t) = type_field {
        let t = t.trim().to_lowercase();
        if INCOME_WORDS.iter().any(|w| t.contains(w)) {
            return Direction::Income;
        }
        if EXPENSE_WORDS.iter().any(|w| t.contains(w)) {
            return Direction::Expense;
        }
    }
    if signed_amount < 0.0 {
        Direction::Expense
    } else {
        Direction::Income
    }
}

fn first_value<'a>(raw: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    let obj = raw.as_object()?;
    fields
        .iter()
        .find_map(|f| obj.get(*f))
        .filter(|v| !v.is_null())
}

fn first_string(raw: &Value, fields: &[&str]) -> Option<String> {
    match first_value(raw, fields)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Merchant key extraction
// ============================================================================

// Leading reference markers ("#1234", "inv 991", "ref20240115") and long
// standalone digit runs are transaction noise, not merchant identity.
static REFERENCE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?:#|inv|invoice|txn|ref)\s*\d+").expect("valid regex")
});
static LONG_DIGIT_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{6,}\b").expect("valid regex"));
static DOMAIN_SUFFIXES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:com|net|org|io|co|app|tv|ai|us|uk|gg|me)\b").expect("valid regex")
});
static COMPANY_SUFFIXES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:inc|llc|ltd|corp|co|gmbh|pty|limited|usa|ab)\b\.?").expect("valid regex")
});
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

/// One named step of the key-extraction pipeline.
///
/// Each rule is a pure text transform; the pipeline is the ordered list
/// below. Order matters: domain suffixes must go before company suffixes
/// ("netflix.com" would otherwise lose its "co"), and punctuation is only
/// stripped after "+"/"&" have been spelled out.
pub struct KeyRule {
    pub name: &'static str,
    transform: fn(&str) -> String,
}

impl KeyRule {
    pub fn apply(&self, input: &str) -> String {
        (self.transform)(input)
    }
}

/// The ordered merchant-key pipeline, applied to lowercased trimmed input
pub const KEY_PIPELINE: &[KeyRule] = &[
    KeyRule {
        name: "strip_reference_markers",
        transform: strip_reference_markers,
    },
    KeyRule {
        name: "strip_domain_suffixes",
        transform: strip_domain_suffixes,
    },
    KeyRule {
        name: "strip_company_suffixes",
        transform: strip_company_suffixes,
    },
    KeyRule {
        name: "spell_out_symbols",
        transform: spell_out_symbols,
    },
    KeyRule {
        name: "strip_punctuation",
        transform: strip_punctuation,
    },
    KeyRule {
        name: "collapse_whitespace",
        transform: collapse_whitespace,
    },
];

fn strip_reference_markers(input: &str) -> String {
    let stripped = REFERENCE_MARKERS.replace_all(input, " ");
    LONG_DIGIT_RUNS.replace_all(&stripped, " ").into_owned()
}

fn strip_domain_suffixes(input: &str) -> String {
    DOMAIN_SUFFIXES.replace_all(input, "").into_owned()
}

fn strip_company_suffixes(input: &str) -> String {
    COMPANY_SUFFIXES.replace_all(input, " ").into_owned()
}

fn spell_out_symbols(input: &str) -> String {
    input
        .replace('+', " plus ")
        .replace('&', " and ")
        .replace('-', " ")
}

fn strip_punctuation(input: &str) -> String {
    PUNCTUATION.replace_all(input, "").into_owned()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the canonical grouping key from free merchant text.
///
/// Returns the "unknown" sentinel when the input, or what survives the
/// pipeline, is shorter than 2 characters.
pub fn extract_merchant_key(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() < 2 {
        return UNKNOWN_KEY.to_string();
    }

    let mut key = trimmed.to_lowercase();
    for rule in KEY_PIPELINE {
        key = rule.apply(&key);
    }

    let key = key.trim().to_string();
    if key.len() < 2 {
        UNKNOWN_KEY.to_string()
    } else {
        key
    }
}
