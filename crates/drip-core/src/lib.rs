//! Drip Core Library
//!
//! Shared functionality for the Drip recurring-charge detector:
//! - Transaction normalization and merchant key extraction
//! - Known-service catalog and category signals
//! - Recurrence gap analysis and amount-consistency scoring
//! - The decision engine that combines the signals into ranked candidates
//! - SQLite persistence for transactions and detected candidates

pub mod amounts;
pub mod catalog;
pub mod db;
pub mod detect;
pub mod error;
pub mod models;
pub mod normalize;
pub mod recurrence;

pub use catalog::{ServiceCatalog, ServiceEntry};
pub use db::{CandidateUpdate, Database, ManualCandidate};
pub use detect::{DetectorOptions, RecurringChargeDetector};
pub use error::{Error, Result};
pub use models::{
    AmountConsistency, CandidateStatus, CandidateSummary, DetectionMethod, Direction, Frequency,
    KnownServiceMatch, NormalizedTransaction, RecurrencePattern, SampleTransaction, SignalScores,
    StoredCandidate, StoredTransaction, SubscriptionCandidate,
};
