//! Detection run handler

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{AppError, AppState};
use drip_core::{DetectorOptions, RecurringChargeDetector, SubscriptionCandidate};

/// Body for a detection run; everything is optional
#[derive(Debug, Default, Deserialize)]
pub struct DetectRequest {
    /// Restrict the run to charges on or after this date
    pub start_date: Option<NaiveDate>,
    /// Restrict the run to charges on or before this date
    pub end_date: Option<NaiveDate>,
    /// Minimum charges before pattern-based branches fire (at least 2)
    pub min_occurrences: Option<usize>,
    /// Relative amount tolerance, within [0, 0.5]
    pub amount_variance_tolerance: Option<f64>,
    /// Hard variance ceiling for pattern-based branches
    pub max_variance_threshold: Option<f64>,
}

/// Response for a detection run
#[derive(Serialize)]
pub struct DetectResponse {
    pub transactions_scanned: usize,
    pub detected: usize,
    pub candidates: Vec<SubscriptionCandidate>,
}

/// POST /api/detect - Run detection over stored expense history
///
/// Fetches expense rows (optionally date-windowed), runs the engine, stores
/// the ranked candidates as pending, and returns them.
pub async fn run_detection(
    State(state): State<Arc<AppState>>,
    body: Option<Json<DetectRequest>>,
) -> Result<Json<DetectResponse>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    if let Some(min) = req.min_occurrences {
        if min < 2 {
            return Err(AppError::bad_request("min_occurrences must be at least 2"));
        }
    }
    if let Some(tolerance) = req.amount_variance_tolerance {
        if !(0.0..=0.5).contains(&tolerance) {
            return Err(AppError::bad_request(
                "amount_variance_tolerance must be within [0, 0.5]",
            ));
        }
    }

    let stored = state
        .db
        .fetch_expenses_in_range(req.start_date, req.end_date)?;
    let rows: Vec<Value> = stored.iter().map(|t| t.to_raw()).collect();

    let mut options = DetectorOptions::default();
    if let Some(min) = req.min_occurrences {
        options.min_occurrences = min;
    }
    if let Some(tolerance) = req.amount_variance_tolerance {
        options.amount_variance_tolerance = tolerance;
    }
    options.max_variance_threshold = req.max_variance_threshold;

    let detector = RecurringChargeDetector::with_options(&state.catalog, options);
    let candidates = detector.detect(&rows);

    state.db.store_candidates(&candidates)?;

    info!(
        scanned = rows.len(),
        detected = candidates.len(),
        "Detection run complete"
    );

    Ok(Json(DetectResponse {
        transactions_scanned: rows.len(),
        detected: candidates.len(),
        candidates,
    }))
}
