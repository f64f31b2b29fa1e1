//! Charge-amount consistency scoring
//!
//! Real subscriptions bill a near-identical amount each cycle. The checker
//! measures how far charges stray from their median and scores the group,
//! with a deliberately lenient band so small price changes and taxes don't
//! disqualify an otherwise steady charge.

use crate::models::AmountConsistency;

/// Leniency multiplier applied to the raw tolerance band
const TOLERANCE_SLACK: f64 = 1.5;
/// Second-chance multiplier: near-misses within twice the band still pass
const SECOND_CHANCE: f64 = 2.0;
/// A single occurrence is consistent by assumption, at this score
const SINGLE_OCCURRENCE_SCORE: f64 = 0.7;

/// Score how stable a group's charge amounts are.
///
/// `tolerance_percent` is the relative band (e.g. 0.05 for 5%) and
/// `tolerance_fixed` the absolute floor in currency units; the larger of the
/// two, widened by the slack multiplier, is the allowed deviation.
pub fn check_amount_consistency(
    amounts: &[f64],
    tolerance_percent: f64,
    tolerance_fixed: f64,
) -> AmountConsistency {
    match amounts.len() {
        0 => AmountConsistency {
            median_amount: 0.0,
            max_deviation: 0.0,
            variance_percentage: 0.0,
            is_consistent: false,
            score: 0.0,
        },
        1 => AmountConsistency {
            median_amount: amounts[0],
            max_deviation: 0.0,
            variance_percentage: 0.0,
            is_consistent: true,
            score: SINGLE_OCCURRENCE_SCORE,
        },
        _ => {
            let median_amount = median(amounts);
            let max_deviation = amounts
                .iter()
                .map(|a| (a - median_amount).abs())
                .fold(0.0, f64::max);
            let variance_percentage = if median_amount == 0.0 {
                0.0
            } else {
                max_deviation / median_amount
            };

            let tolerance = (median_amount * tolerance_percent * TOLERANCE_SLACK)
                .max(tolerance_fixed * TOLERANCE_SLACK);
            let within_band = max_deviation <= tolerance;
            let near_miss = max_deviation <= SECOND_CHANCE * tolerance;

            let score = if within_band {
                (1.0 - variance_percentage / (tolerance_percent * 3.0)).max(0.4)
            } else if near_miss {
                0.3
            } else {
                0.0
            };

            AmountConsistency {
                median_amount,
                max_deviation,
                variance_percentage,
                is_consistent: within_band || near_miss,
                score,
            }
        }
    }
}

/// Calculate median of a slice
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
