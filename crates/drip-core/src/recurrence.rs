//! Recurrence gap analysis
//!
//! Given a merchant group's charge dates in ascending order, infer whether
//! the gaps between consecutive charges form a periodic pattern and classify
//! its cadence.

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{Frequency, RecurrencePattern};

/// Inclusive gap ranges per cadence, checked in order; the earlier entry wins
/// where ranges overlap, which deliberately biases ambiguous gaps toward the
/// earlier class (and the monthly band toward monthly).
const GAP_CLASSES: &[(i64, i64, Frequency)] = &[
    (4, 12, Frequency::Weekly),
    (10, 20, Frequency::BiWeekly),
    (20, 45, Frequency::Monthly),
    (80, 100, Frequency::Quarterly),
    (340, 390, Frequency::Annual),
];

/// Looser monthly band tried when no exact class matches
const APPROXIMATE_MONTHLY_RANGE: (i64, i64) = (15, 50);

/// Patterns with gap consistency below this are rejected outright
const MIN_CONSISTENCY: f64 = 0.4;

/// Infer a periodic pattern from ascending charge dates.
///
/// Returns `None` for fewer than two dates, when no positive gaps remain,
/// when the gaps are too erratic, or when the median gap fits no cadence.
pub fn detect_recurrence(dates: &[NaiveDate]) -> Option<RecurrencePattern> {
    if dates.len() < 2 {
        return None;
    }

    let gaps: Vec<i64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|d| *d > 0)
        .collect();
    if gaps.is_empty() {
        return None;
    }

    let median_gap_days = lower_median(&gaps);

    // Mean absolute deviation from the median, relative to the median.
    let mad = gaps
        .iter()
        .map(|g| (g - median_gap_days).abs() as f64)
        .sum::<f64>()
        / gaps.len() as f64;
    let consistency = (1.0 - mad / median_gap_days as f64).max(0.0);

    if consistency < MIN_CONSISTENCY {
        debug!(median_gap_days, consistency, "Gaps too erratic for a pattern");
        return None;
    }

    let (frequency, approximate) = classify_gap(median_gap_days)?;

    Some(RecurrencePattern {
        frequency,
        approximate,
        median_gap_days,
        consistency,
        gaps,
    })
}

/// Map a median gap to a cadence; first matching range wins
fn classify_gap(median_gap_days: i64) -> Option<(Frequency, bool)> {
    for (lo, hi, frequency) in GAP_CLASSES {
        if (*lo..=*hi).contains(&median_gap_days) {
            return Some((*frequency, false));
        }
    }
    let (lo, hi) = APPROXIMATE_MONTHLY_RANGE;
    if (lo..=hi).contains(&median_gap_days) {
        return Some((Frequency::Monthly, true));
    }
    None
}

/// Lower-middle median keeps the gap an integral day count on even-sized sets
fn lower_median(values: &[i64]) -> i64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted[(sorted.len() - 1) / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(days: &[i64]) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        days.iter()
            .map(|d| start + chrono::Duration::days(*d))
            .collect()
    }

    #[test]
    fn test_monthly_pattern() {
        let pattern = detect_recurrence(&dates(&[0, 30, 60, 91])).unwrap();
        assert_eq!(pattern.frequency, Frequency::Monthly);
        assert!(!pattern.approximate);
        assert_eq!(pattern.median_gap_days, 30);
        assert!(pattern.consistency > 0.9);
    }

    #[test]
    fn test_biweekly_pattern() {
        let pattern = detect_recurrence(&dates(&[0, 14, 28])).unwrap();
        assert_eq!(pattern.frequency, Frequency::BiWeekly);
        assert_eq!(pattern.median_gap_days, 14);
    }

    #[test]
    fn test_weekly_and_quarterly_and_annual() {
        assert_eq!(
            detect_recurrence(&dates(&[0, 7, 14, 21])).unwrap().frequency,
            Frequency::Weekly
        );
        assert_eq!(
            detect_recurrence(&dates(&[0, 91, 182])).unwrap().frequency,
            Frequency::Quarterly
        );
        assert_eq!(
            detect_recurrence(&dates(&[0, 365, 730])).unwrap().frequency,
            Frequency::Annual
        );
    }

    #[test]
    fn test_overlapping_ranges_prefer_earlier_class() {
        // 10-12 day gaps fall in both the weekly and bi-weekly ranges;
        // the weekly range is listed first and wins.
        assert_eq!(classify_gap(12), Some((Frequency::Weekly, false)));
        // 20 sits in both bi-weekly and monthly; bi-weekly wins.
        assert_eq!(classify_gap(20), Some((Frequency::BiWeekly, false)));
    }

    #[test]
    fn test_approximate_monthly_band() {
        assert_eq!(classify_gap(46), Some((Frequency::Monthly, true)));
        assert_eq!(classify_gap(50), Some((Frequency::Monthly, true)));
        assert_eq!(classify_gap(51), None);
        assert_eq!(classify_gap(60), None);
        assert_eq!(classify_gap(2), None);
    }

    #[test]
    fn test_erratic_gaps_rejected() {
        // Gaps 5, 60, 3: far too spread around their median
        assert!(detect_recurrence(&dates(&[0, 5, 65, 68])).is_none());
    }

    #[test]
    fn test_same_day_charges_produce_no_gaps() {
        assert!(detect_recurrence(&dates(&[10, 10, 10])).is_none());
    }

    #[test]
    fn test_single_date_is_no_pattern() {
        assert!(detect_recurrence(&dates(&[0])).is_none());
    }

    #[test]
    fn test_lower_median_on_even_counts() {
        assert_eq!(lower_median(&[10, 30]), 10);
        assert_eq!(lower_median(&[30, 10, 20]), 20);
    }
}
