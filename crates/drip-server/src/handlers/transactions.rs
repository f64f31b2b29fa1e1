//! Transaction ingestion and listing handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use drip_core::models::{NewStoredTransaction, StoredTransaction};
use drip_core::normalize::normalize_transaction;

/// Response for a batch ingest
#[derive(Serialize)]
pub struct IngestResponse {
    pub imported: usize,
    pub skipped: usize,
}

/// POST /api/transactions - Ingest a JSON array of raw transaction rows
///
/// Rows are duck-typed: field names vary by source and missing fields are
/// tolerated. Rows identical to an already-stored one (same date, amount,
/// description, and merchant) are skipped.
pub async fn ingest_transactions(
    State(state): State<Arc<AppState>>,
    Json(rows): Json<Vec<Value>>,
) -> Result<Json<IngestResponse>, AppError> {
    let mut imported = 0;
    let mut skipped = 0;

    for (i, raw) in rows.iter().enumerate() {
        let normalized = normalize_transaction(raw, i);
        let new_tx = NewStoredTransaction {
            external_id: Some(normalized.id.clone()),
            date: normalized.date,
            amount: normalized.amount,
            direction: normalized.direction,
            merchant: normalized.merchant,
            description: normalized.description,
            category: normalized.category,
        };

        if state.db.insert_transaction(&new_tx)?.is_some() {
            imported += 1;
        } else {
            skipped += 1;
        }
    }

    info!(imported, skipped, "Transaction ingest complete");
    Ok(Json(IngestResponse { imported, skipped }))
}

/// Query params for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/transactions - List stored transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<StoredTransaction>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, MAX_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let transactions = state.db.list_transactions(limit, offset)?;
    Ok(Json(transactions))
}
