//! Candidate persistence and the review workflow
//!
//! Detection output is stored as `pending` rows; the user then confirms or
//! rejects each one. Re-running detection replaces pending rows but never
//! touches rows the user has already reviewed.

use chrono::NaiveDate;
use rusqlite::params;
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    CandidateStatus, CandidateSummary, DetectionMethod, Frequency, SignalScores, StoredCandidate,
    SubscriptionCandidate,
};
use crate::normalize::extract_merchant_key;

/// Fields a review client may change on a stored candidate
#[derive(Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub merchant: Option<String>,
    pub estimated_monthly_amount: Option<f64>,
    pub frequency: Option<Frequency>,
    pub category_id: Option<String>,
}

/// A user-supplied subscription not produced by detection
#[derive(Debug, Clone)]
pub struct ManualCandidate {
    pub merchant: String,
    pub estimated_monthly_amount: f64,
    pub frequency: Frequency,
    pub category_id: Option<String>,
}

const CANDIDATE_COLUMNS: &str = r#"
    id, merchant_key, merchant, category_id, estimated_monthly_amount, frequency,
    first_detected_date, last_charge_date, next_expected_date, confidence_score,
    occurrence_count, average_amount, variance_percentage,
    recurrence_score, amount_consistency_score, keyword_score, category_score,
    detection_method, pattern_type, reason, status, created_at
"#;

impl Database {
    /// Store a detection run's output.
    ///
    /// Pending rows from earlier runs are replaced; confirmed and rejected
    /// rows persist so user decisions survive re-detection.
    pub fn store_candidates(&self, candidates: &[SubscriptionCandidate]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let replaced = tx.execute(
            "DELETE FROM subscription_candidates WHERE status = 'pending'",
            [],
        )?;

        for candidate in candidates {
            tx.execute(
                r#"
                INSERT INTO subscription_candidates
                    (merchant_key, merchant, category_id, estimated_monthly_amount, frequency,
                     first_detected_date, last_charge_date, next_expected_date, confidence_score,
                     occurrence_count, average_amount, variance_percentage,
                     recurrence_score, amount_consistency_score, keyword_score, category_score,
                     detection_method, pattern_type, reason, status)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
                "#,
                params![
                    candidate.merchant_key,
                    candidate.merchant,
                    candidate.category_id,
                    candidate.estimated_monthly_amount,
                    candidate.frequency.as_str(),
                    candidate.first_detected_date.map(|d| d.to_string()),
                    candidate.last_charge_date.map(|d| d.to_string()),
                    candidate.next_expected_date.map(|d| d.to_string()),
                    candidate.confidence_score,
                    candidate.occurrence_count as i64,
                    candidate.average_amount,
                    candidate.variance_percentage,
                    candidate.signals.recurrence_score,
                    candidate.signals.amount_consistency_score,
                    candidate.signals.keyword_score,
                    candidate.signals.category_score,
                    candidate.detection_method.as_str(),
                    candidate.pattern_type,
                    candidate.reason,
                ],
            )?;
            let candidate_id = tx.last_insert_rowid();

            for tx_id in &candidate.contributing_transaction_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO candidate_transactions (candidate_id, transaction_id) VALUES (?, ?)",
                    params![candidate_id, tx_id],
                )?;
            }
        }

        tx.commit()?;
        debug!(
            stored = candidates.len(),
            replaced, "Stored detection candidates"
        );
        Ok(candidates.len())
    }

    /// List candidates, optionally filtered by status, ranked by confidence
    pub fn list_candidates(&self, status: Option<CandidateStatus>) -> Result<Vec<StoredCandidate>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM subscription_candidates
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY confidence_score DESC, id ASC",
            CANDIDATE_COLUMNS
        );
        let mut stmt = conn.prepare(&query)?;

        let rows = stmt
            .query_map(params![status.map(|s| s.as_str())], row_to_candidate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<StoredCandidate>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM subscription_candidates WHERE id = ?",
            CANDIDATE_COLUMNS
        );
        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt
            .query_map(params![id], row_to_candidate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.pop())
    }

    /// Transaction ids that contributed to a candidate
    pub fn candidate_transaction_ids(&self, id: i64) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id FROM candidate_transactions WHERE candidate_id = ? ORDER BY transaction_id",
        )?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn confirm_candidate(&self, id: i64) -> Result<()> {
        self.set_candidate_status(id, CandidateStatus::Confirmed)
    }

    pub fn reject_candidate(&self, id: i64) -> Result<()> {
        self.set_candidate_status(id, CandidateStatus::Rejected)
    }

    fn set_candidate_status(&self, id: i64, status: CandidateStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE subscription_candidates SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Candidate {} not found", id)));
        }
        Ok(())
    }

    /// Patch user-editable fields on a stored candidate
    pub fn update_candidate(&self, id: i64, update: &CandidateUpdate) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE subscription_candidates SET
                merchant = COALESCE(?, merchant),
                estimated_monthly_amount = COALESCE(?, estimated_monthly_amount),
                frequency = COALESCE(?, frequency),
                category_id = COALESCE(?, category_id)
            WHERE id = ?
            "#,
            params![
                update.merchant,
                update.estimated_monthly_amount,
                update.frequency.map(|f| f.as_str()),
                update.category_id,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Candidate {} not found", id)));
        }
        Ok(())
    }

    /// Create a user-asserted subscription; stored as confirmed immediately
    pub fn create_manual_candidate(&self, manual: &ManualCandidate) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscription_candidates
                (merchant_key, merchant, category_id, estimated_monthly_amount, frequency,
                 confidence_score, occurrence_count, detection_method, pattern_type, reason, status)
            VALUES (?, ?, ?, ?, ?, 1.0, 0, ?, ?, 'added manually', 'confirmed')
            "#,
            params![
                extract_merchant_key(&manual.merchant),
                manual.merchant,
                manual.category_id,
                manual.estimated_monthly_amount,
                manual.frequency.as_str(),
                DetectionMethod::Manual.as_str(),
                manual.frequency.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Candidate counts and estimated monthly totals per status
    pub fn candidate_summary(&self) -> Result<CandidateSummary> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT
                COUNT(CASE WHEN status = 'pending' THEN 1 END),
                COUNT(CASE WHEN status = 'confirmed' THEN 1 END),
                COUNT(CASE WHEN status = 'rejected' THEN 1 END),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN estimated_monthly_amount END), 0),
                COALESCE(SUM(CASE WHEN status = 'confirmed' THEN estimated_monthly_amount END), 0)
            FROM subscription_candidates
            "#,
            [],
            |row| {
                Ok(CandidateSummary {
                    pending_count: row.get(0)?,
                    confirmed_count: row.get(1)?,
                    rejected_count: row.get(2)?,
                    pending_monthly_total: row.get(3)?,
                    confirmed_monthly_total: row.get(4)?,
                })
            },
        )
        .map_err(Into::into)
    }
}

fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredCandidate> {
    let frequency_str: String = row.get(5)?;
    let first_str: Option<String> = row.get(6)?;
    let last_str: Option<String> = row.get(7)?;
    let next_str: Option<String> = row.get(8)?;
    let method_str: String = row.get(17)?;
    let status_str: String = row.get(20)?;
    let created_at_str: String = row.get(21)?;

    let parse_day = |s: Option<String>| {
        s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
    };

    Ok(StoredCandidate {
        id: row.get(0)?,
        merchant_key: row.get(1)?,
        merchant: row.get(2)?,
        category_id: row.get(3)?,
        estimated_monthly_amount: row.get(4)?,
        frequency: frequency_str.parse().unwrap_or(Frequency::Monthly),
        first_detected_date: parse_day(first_str),
        last_charge_date: parse_day(last_str),
        next_expected_date: parse_day(next_str),
        confidence_score: row.get(9)?,
        occurrence_count: row.get(10)?,
        average_amount: row.get(11)?,
        variance_percentage: row.get(12)?,
        signals: SignalScores {
            recurrence_score: row.get(13)?,
            amount_consistency_score: row.get(14)?,
            keyword_score: row.get(15)?,
            category_score: row.get(16)?,
        },
        detection_method: method_str.parse().unwrap_or(DetectionMethod::Recurrence),
        pattern_type: row.get(18)?,
        reason: row.get(19)?,
        status: status_str.parse().unwrap_or(CandidateStatus::Pending),
        created_at: parse_datetime(&created_at_str),
    })
}
