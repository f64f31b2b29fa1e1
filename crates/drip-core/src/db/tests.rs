//! Database layer tests

use chrono::NaiveDate;

use super::{CandidateUpdate, Database, ManualCandidate};
use crate::models::{
    CandidateStatus, DetectionMethod, Direction, Frequency, NewStoredTransaction, SignalScores,
    SubscriptionCandidate,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_tx(date: Option<NaiveDate>, amount: f64, merchant: &str) -> NewStoredTransaction {
    NewStoredTransaction {
        external_id: None,
        date,
        amount,
        direction: Direction::Expense,
        merchant: merchant.to_string(),
        description: format!("{} charge", merchant),
        category: None,
    }
}

fn sample_candidate(merchant: &str, confidence: f64) -> SubscriptionCandidate {
    SubscriptionCandidate {
        merchant_key: merchant.to_lowercase(),
        merchant: merchant.to_string(),
        category_id: None,
        estimated_monthly_amount: 9.99,
        frequency: Frequency::Monthly,
        first_detected_date: Some(day(2024, 1, 1)),
        last_charge_date: Some(day(2024, 3, 1)),
        next_expected_date: Some(day(2024, 3, 31)),
        confidence_score: confidence,
        contributing_transaction_ids: vec!["t1".into(), "t2".into(), "t3".into()],
        occurrence_count: 3,
        average_amount: 9.99,
        variance_percentage: 0.0,
        signals: SignalScores::default(),
        detection_method: DetectionMethod::Recurrence,
        pattern_type: "monthly".to_string(),
        reason: "test".to_string(),
        sample_transactions: vec![],
    }
}

#[test]
fn test_insert_transaction_dedups() {
    let db = Database::in_memory().unwrap();
    let tx = new_tx(Some(day(2024, 1, 15)), 15.49, "Netflix");

    assert!(db.insert_transaction(&tx).unwrap().is_some());
    assert!(db.insert_transaction(&tx).unwrap().is_none());
    assert_eq!(db.count_transactions().unwrap(), 1);
}

#[test]
fn test_fetch_expenses_in_range_filters() {
    let db = Database::in_memory().unwrap();

    db.insert_transaction(&new_tx(Some(day(2024, 1, 15)), 10.0, "A"))
        .unwrap();
    db.insert_transaction(&new_tx(Some(day(2024, 2, 15)), 20.0, "B"))
        .unwrap();
    db.insert_transaction(&new_tx(Some(day(2024, 3, 15)), 30.0, "C"))
        .unwrap();
    // Income rows and undated rows never come back from a range fetch
    db.insert_transaction(&NewStoredTransaction {
        direction: Direction::Income,
        ..new_tx(Some(day(2024, 2, 1)), 2500.0, "Payroll")
    })
    .unwrap();
    db.insert_transaction(&new_tx(None, 5.0, "Undated"))
        .unwrap();

    let all = db.fetch_expenses_in_range(None, None).unwrap();
    assert_eq!(all.len(), 3);
    // Oldest first
    assert_eq!(all[0].merchant, "A");

    let feb = db
        .fetch_expenses_in_range(Some(day(2024, 2, 1)), Some(day(2024, 2, 28)))
        .unwrap();
    assert_eq!(feb.len(), 1);
    assert_eq!(feb[0].merchant, "B");
}

#[test]
fn test_stored_transaction_round_trips_to_raw() {
    let db = Database::in_memory().unwrap();
    db.insert_transaction(&new_tx(Some(day(2024, 1, 15)), 15.49, "Netflix"))
        .unwrap();

    let raw = db.fetch_expenses_in_range(None, None).unwrap()[0].to_raw();
    assert_eq!(raw["merchant"], "Netflix");
    assert_eq!(raw["type"], "expense");
    assert_eq!(raw["date"], "2024-01-15");
}

#[test]
fn test_store_candidates_replaces_pending_only() {
    let db = Database::in_memory().unwrap();

    db.store_candidates(&[sample_candidate("Netflix", 0.9), sample_candidate("Hulu", 0.7)])
        .unwrap();
    let stored = db.list_candidates(None).unwrap();
    assert_eq!(stored.len(), 2);

    // Confirm one, then re-run detection with different output
    let netflix_id = stored
        .iter()
        .find(|c| c.merchant == "Netflix")
        .unwrap()
        .id;
    db.confirm_candidate(netflix_id).unwrap();

    db.store_candidates(&[sample_candidate("Spotify", 0.8)]).unwrap();

    let after = db.list_candidates(None).unwrap();
    let merchants: Vec<_> = after.iter().map(|c| c.merchant.as_str()).collect();
    // Confirmed Netflix survives; pending Hulu was replaced
    assert!(merchants.contains(&"Netflix"));
    assert!(merchants.contains(&"Spotify"));
    assert!(!merchants.contains(&"Hulu"));
}

#[test]
fn test_candidate_join_rows() {
    let db = Database::in_memory().unwrap();
    db.store_candidates(&[sample_candidate("Netflix", 0.9)]).unwrap();

    let id = db.list_candidates(None).unwrap()[0].id;
    let ids = db.candidate_transaction_ids(id).unwrap();
    assert_eq!(ids, vec!["t1", "t2", "t3"]);
}

#[test]
fn test_confirm_reject_and_status_filter() {
    let db = Database::in_memory().unwrap();
    db.store_candidates(&[sample_candidate("Netflix", 0.9), sample_candidate("Hulu", 0.7)])
        .unwrap();

    let stored = db.list_candidates(None).unwrap();
    db.confirm_candidate(stored[0].id).unwrap();
    db.reject_candidate(stored[1].id).unwrap();

    assert_eq!(
        db.list_candidates(Some(CandidateStatus::Confirmed))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        db.list_candidates(Some(CandidateStatus::Rejected))
            .unwrap()
            .len(),
        1
    );
    assert!(db
        .list_candidates(Some(CandidateStatus::Pending))
        .unwrap()
        .is_empty());

    assert!(db.confirm_candidate(9999).is_err());
}

#[test]
fn test_update_candidate_patches_fields() {
    let db = Database::in_memory().unwrap();
    db.store_candidates(&[sample_candidate("Netflix", 0.9)]).unwrap();
    let id = db.list_candidates(None).unwrap()[0].id;

    db.update_candidate(
        id,
        &CandidateUpdate {
            estimated_monthly_amount: Some(19.99),
            frequency: Some(Frequency::Annual),
            ..Default::default()
        },
    )
    .unwrap();

    let updated = db.get_candidate(id).unwrap().unwrap();
    assert_eq!(updated.estimated_monthly_amount, 19.99);
    assert_eq!(updated.frequency, Frequency::Annual);
    // Untouched fields keep their values
    assert_eq!(updated.merchant, "Netflix");
}

#[test]
fn test_manual_candidate_is_confirmed() {
    let db = Database::in_memory().unwrap();
    let id = db
        .create_manual_candidate(&ManualCandidate {
            merchant: "Local Paper".to_string(),
            estimated_monthly_amount: 12.50,
            frequency: Frequency::Monthly,
            category_id: Some("news".to_string()),
        })
        .unwrap();

    let stored = db.get_candidate(id).unwrap().unwrap();
    assert_eq!(stored.status, CandidateStatus::Confirmed);
    assert_eq!(stored.detection_method, DetectionMethod::Manual);
    assert_eq!(stored.merchant_key, "local paper");
}

#[test]
fn test_candidate_summary() {
    let db = Database::in_memory().unwrap();
    db.store_candidates(&[sample_candidate("Netflix", 0.9), sample_candidate("Hulu", 0.7)])
        .unwrap();
    let stored = db.list_candidates(None).unwrap();
    db.confirm_candidate(stored[0].id).unwrap();

    let summary = db.candidate_summary().unwrap();
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.confirmed_count, 1);
    assert_eq!(summary.rejected_count, 0);
    assert_eq!(summary.confirmed_monthly_total, 9.99);
    assert_eq!(summary.pending_monthly_total, 9.99);
}
