//! Domain models for Drip

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Direction of money movement for a normalized transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Expense,
    Income,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing cadence of a recurring charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    /// Expected days between charges at this cadence
    pub fn typical_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::BiWeekly => 14,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Annual => 365,
        }
    }

    /// Multiplier that converts one charge at this cadence into a
    /// per-month cost
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 4.33,
            Self::BiWeekly => 2.17,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::Annual => 1.0 / 12.0,
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "bi-weekly" | "biweekly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" | "annually" | "yearly" => Ok(Self::Annual),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw transaction coerced into the canonical shape the detector works on.
///
/// Created fresh per detection run and discarded after grouping; rows with an
/// unparseable date or an income direction are filtered before grouping.
#[derive(Debug, Clone)]
pub struct NormalizedTransaction {
    pub id: String,
    pub date: Option<NaiveDate>,
    /// Magnitude of the charge; the sign is carried by `direction`
    pub amount: f64,
    pub direction: Direction,
    /// Display name; falls back to the description, then to "Unknown"
    pub merchant: String,
    pub description: String,
    /// Canonical grouping key derived from the merchant text
    pub merchant_key: String,
    /// Lowercased category label, if the source row carried one
    pub category: Option<String>,
}

/// A periodic charge pattern inferred from the day gaps of a merchant group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// True when the gap only fits the looser monthly band
    pub approximate: bool,
    pub median_gap_days: i64,
    /// How tightly the gaps cluster around their median, in [0, 1]
    pub consistency: f64,
    pub gaps: Vec<i64>,
}

/// How stable the charge amount is across a merchant group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountConsistency {
    pub median_amount: f64,
    pub max_deviation: f64,
    /// max_deviation / median_amount, or 0 for a zero median
    pub variance_percentage: f64,
    pub is_consistent: bool,
    pub score: f64,
}

/// A hit against the curated table of well-known recurring services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownServiceMatch {
    pub name: String,
    pub category: String,
    pub typical_frequency: Frequency,
    pub confidence: f64,
}

/// Which decision branch produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Category,
    KnownSubscription,
    Recurrence,
    /// User-created via the API; never produced by the detector
    Manual,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::KnownSubscription => "known_subscription",
            Self::Recurrence => "recurrence",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "known_subscription" => Ok(Self::KnownSubscription),
            "recurrence" => Ok(Self::Recurrence),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown detection method: {}", s)),
        }
    }
}

/// Per-signal contribution scores attached to every candidate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub recurrence_score: f64,
    pub amount_consistency_score: f64,
    pub keyword_score: f64,
    pub category_score: f64,
}

/// A compact view of one contributing transaction, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
}

/// A detected recurring charge, ranked by confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCandidate {
    pub merchant_key: String,
    pub merchant: String,
    /// Most frequent category label across the group, if any
    pub category_id: Option<String>,
    pub estimated_monthly_amount: f64,
    pub frequency: Frequency,
    pub first_detected_date: Option<NaiveDate>,
    pub last_charge_date: Option<NaiveDate>,
    pub next_expected_date: Option<NaiveDate>,
    /// Heuristic certainty in [0, 1]
    pub confidence_score: f64,
    pub contributing_transaction_ids: Vec<String>,
    pub occurrence_count: usize,
    pub average_amount: f64,
    pub variance_percentage: f64,
    pub signals: SignalScores,
    pub detection_method: DetectionMethod,
    /// e.g. "monthly", "monthly-approximate", "known-service"
    pub pattern_type: String,
    /// Human-readable explanation of why this group was flagged
    pub reason: String,
    /// First three contributing transactions
    pub sample_transactions: Vec<SampleTransaction>,
}

/// Review status of a persisted candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown candidate status: {}", s)),
        }
    }
}

/// A candidate as persisted, with its durable identifier and review status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCandidate {
    pub id: i64,
    pub merchant_key: String,
    pub merchant: String,
    pub category_id: Option<String>,
    pub estimated_monthly_amount: f64,
    pub frequency: Frequency,
    pub first_detected_date: Option<NaiveDate>,
    pub last_charge_date: Option<NaiveDate>,
    pub next_expected_date: Option<NaiveDate>,
    pub confidence_score: f64,
    pub occurrence_count: i64,
    pub average_amount: f64,
    pub variance_percentage: f64,
    pub signals: SignalScores,
    pub detection_method: DetectionMethod,
    pub pattern_type: String,
    pub reason: String,
    pub status: CandidateStatus,
    pub created_at: DateTime<Utc>,
}

/// A transaction row as persisted in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    /// Identifier carried over from the source system, if any
    pub external_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub direction: Direction,
    pub merchant: String,
    pub description: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredTransaction {
    /// Bridge a stored row back into the duck-typed shape the detector reads
    pub fn to_raw(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.external_id.clone().unwrap_or_else(|| self.id.to_string()),
            "date": self.date.map(|d| d.to_string()),
            "amount": self.amount,
            "type": self.direction.as_str(),
            "merchant": self.merchant,
            "description": self.description,
            "category": self.category,
        })
    }
}

/// A new transaction to be stored (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewStoredTransaction {
    pub external_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub direction: Direction,
    pub merchant: String,
    pub description: String,
    pub category: Option<String>,
}

/// Aggregated candidate counts and monthly totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub pending_count: i64,
    pub confirmed_count: i64,
    pub rejected_count: i64,
    pub pending_monthly_total: f64,
    pub confirmed_monthly_total: f64,
}
