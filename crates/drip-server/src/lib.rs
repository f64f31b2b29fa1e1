//! Drip Web Server
//!
//! Axum-based REST API around the drip-core detection engine:
//! - Transaction ingestion (duck-typed JSON rows)
//! - Detection runs over stored expense history
//! - Candidate review workflow (confirm / reject / edit / manual create)
//! - Summary aggregation

use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use drip_core::{Database, ServiceCatalog};

mod handlers;


/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Immutable known-service and keyword tables, built once at startup
    pub catalog: ServiceCatalog,
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database) -> Router {
    let state = Arc::new(AppState {
        db,
        catalog: ServiceCatalog::builtin(),
    });

    let api_routes = Router::new()
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::ingest_transactions),
        )
        // Detection
        .route("/detect", post(handlers::run_detection))
        // Candidates
        .route(
            "/candidates",
            get(handlers::list_candidates).post(handlers::create_candidate),
        )
        .route("/candidates/summary", get(handlers::candidate_summary))
        .route(
            "/candidates/:id",
            get(handlers::get_candidate).put(handlers::update_candidate),
        )
        .route("/candidates/:id/confirm", post(handlers::confirm_candidate))
        .route("/candidates/:id/reject", post(handlers::reject_candidate))
        .route(
            "/candidates/:id/transactions",
            get(handlers::candidate_transactions),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE]),
        )
}

/// Open the database and serve the API until shutdown
pub async fn run_server(host: &str, port: u16, db_path: &str) -> anyhow::Result<()> {
    let db = Database::new(db_path)?;
    let app = create_router(db);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
