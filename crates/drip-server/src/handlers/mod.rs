//! Request handlers, organized by domain

mod candidates;
mod detection;
mod transactions;

pub use candidates::{
    candidate_summary, candidate_transactions, confirm_candidate, create_candidate, get_candidate,
    list_candidates, reject_candidate, update_candidate,
};
pub use detection::run_detection;
pub use transactions::{ingest_transactions, list_transactions};
