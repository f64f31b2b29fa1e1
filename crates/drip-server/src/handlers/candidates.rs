//! Candidate review handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, SuccessResponse};
use drip_core::models::{
    CandidateStatus, CandidateSummary, Frequency, StoredCandidate, StoredTransaction,
};
use drip_core::{CandidateUpdate, ManualCandidate};

/// Query params for listing candidates
#[derive(Debug, Deserialize)]
pub struct ListCandidatesQuery {
    /// Filter by review status (pending / confirmed / rejected)
    pub status: Option<String>,
}

/// GET /api/candidates - List candidates ranked by confidence
pub async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<Json<Vec<StoredCandidate>>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse::<CandidateStatus>()
                .map_err(|e| AppError::bad_request(&e))?,
        ),
        None => None,
    };

    let candidates = state.db.list_candidates(status)?;
    Ok(Json(candidates))
}

/// Candidate detail: the stored record plus its contributing transaction ids
#[derive(Serialize)]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: StoredCandidate,
    pub contributing_transaction_ids: Vec<String>,
}

/// GET /api/candidates/:id - Candidate detail
pub async fn get_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CandidateDetail>, AppError> {
    let candidate = state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;
    let contributing_transaction_ids = state.db.candidate_transaction_ids(id)?;

    Ok(Json(CandidateDetail {
        candidate,
        contributing_transaction_ids,
    }))
}

/// POST /api/candidates/:id/confirm - Mark a candidate as a real subscription
pub async fn confirm_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;

    state.db.confirm_candidate(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/candidates/:id/reject - Mark a candidate as not a subscription
pub async fn reject_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;

    state.db.reject_candidate(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Body for editing a stored candidate; all fields optional
#[derive(Debug, Deserialize)]
pub struct UpdateCandidateRequest {
    pub merchant: Option<String>,
    pub estimated_monthly_amount: Option<f64>,
    pub frequency: Option<Frequency>,
    pub category_id: Option<String>,
}

/// PUT /api/candidates/:id - Edit user-facing fields of a candidate
pub async fn update_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCandidateRequest>,
) -> Result<Json<StoredCandidate>, AppError> {
    state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;

    state.db.update_candidate(
        id,
        &CandidateUpdate {
            merchant: body.merchant,
            estimated_monthly_amount: body.estimated_monthly_amount,
            frequency: body.frequency,
            category_id: body.category_id,
        },
    )?;

    let updated = state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;
    Ok(Json(updated))
}

/// Body for manually creating a subscription
#[derive(Debug, Deserialize)]
pub struct CreateCandidateRequest {
    pub merchant: String,
    pub estimated_monthly_amount: f64,
    pub frequency: Option<Frequency>,
    pub category_id: Option<String>,
}

/// Response for a manual create
#[derive(Serialize)]
pub struct CreateCandidateResponse {
    pub success: bool,
    pub id: i64,
}

/// POST /api/candidates - Manually add a subscription the detector missed
pub async fn create_candidate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCandidateRequest>,
) -> Result<Json<CreateCandidateResponse>, AppError> {
    if body.merchant.trim().is_empty() {
        return Err(AppError::bad_request("merchant must not be empty"));
    }
    if body.estimated_monthly_amount < 0.0 {
        return Err(AppError::bad_request(
            "estimated_monthly_amount must not be negative",
        ));
    }

    let id = state.db.create_manual_candidate(&ManualCandidate {
        merchant: body.merchant,
        estimated_monthly_amount: body.estimated_monthly_amount,
        frequency: body.frequency.unwrap_or(Frequency::Monthly),
        category_id: body.category_id,
    })?;

    Ok(Json(CreateCandidateResponse { success: true, id }))
}

/// GET /api/candidates/summary - Counts and monthly totals per status
pub async fn candidate_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CandidateSummary>, AppError> {
    Ok(Json(state.db.candidate_summary()?))
}

/// GET /api/candidates/:id/transactions - The charges behind a candidate
pub async fn candidate_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StoredTransaction>>, AppError> {
    state
        .db
        .get_candidate(id)?
        .ok_or_else(|| AppError::not_found(&format!("Candidate {} not found", id)))?;

    let refs = state.db.candidate_transaction_ids(id)?;
    let transactions = state.db.find_transactions_by_refs(&refs)?;
    Ok(Json(transactions))
}
