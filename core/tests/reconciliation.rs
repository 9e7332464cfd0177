//! Integration tests for reconciliation checks.
//!
//! Tests verify:
//! 1. Signed diff and tolerance handling for a single check
//! 2. Every breakdown of real data reconciles
//! 3. A breakdown missing a group fails without returning an error

mod common;

use common::{date, init_logging, range, synthetic};
use recovery_core::{
    aggregate::{aggregate, aggregate_overall, Dimension},
    config::{ReconciliationConfig, SegmentationConfig},
    reconciliation::{check, check_counts, reconcile_breakdown, MetricKind},
    segmentation::compute_segments,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ─────────────────────────────────────────────────────────────────────────────
// Single checks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn two_dollar_gap_fails_a_one_dollar_tolerance() {
    let result = check(dec!(1000), &[dec!(600), dec!(398)], dec!(1));
    assert!(!result.passed);
    assert_eq!(result.diff, dec!(2));
}

#[test]
fn gap_within_tolerance_passes() {
    let result = check(dec!(1000), &[dec!(600), dec!(399)], dec!(1));
    assert!(result.passed);
    assert_eq!(result.diff, dec!(1));
}

#[test]
fn diff_keeps_its_sign() {
    let result = check(dec!(100), &[dec!(80), dec!(70)], dec!(100));
    assert!(result.passed);
    assert_eq!(result.diff, dec!(-50));
}

#[test]
fn counts_use_the_same_rule() {
    assert!(check_counts(10, &[4, 5], dec!(1)).passed);
    let off = check_counts(10, &[4, 4], dec!(1));
    assert!(!off.passed);
    assert_eq!(off.diff, dec!(2));
}

#[test]
fn empty_breakdown_against_zero_passes() {
    let result = check(Decimal::ZERO, &[], Decimal::ZERO);
    assert!(result.passed);
    assert_eq!(result.diff, Decimal::ZERO);
}

// ─────────────────────────────────────────────────────────────────────────────
// Whole breakdowns
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn platform_and_segment_breakdowns_reconcile() {
    let records = synthetic(21, "2025-03-01", "2025-03-31");
    let segments = compute_segments(&records, date("2025-03-31"), &SegmentationConfig::default());
    let period = range("2025-03-01", "2025-03-31");
    let overall = aggregate_overall(&records, period);
    let cfg = ReconciliationConfig::default();

    for dim in [Dimension::Platform, Dimension::Segment] {
        let breakdown = aggregate(&records, &segments, &[dim], period);
        let report = reconcile_breakdown("breakdown", &overall, &breakdown, &cfg);
        assert!(report.passed(), "{dim:?} failed: {:?}", report.failures().collect::<Vec<_>>());
        assert!(report.checks.iter().all(|c| c.check.diff == Decimal::ZERO));
    }
}

#[test]
fn missing_group_is_reported_not_raised() {
    init_logging();
    let records = synthetic(22, "2025-03-01", "2025-03-31");
    let segments = compute_segments(&records, date("2025-03-31"), &SegmentationConfig::default());
    let period = range("2025-03-01", "2025-03-31");
    let overall = aggregate_overall(&records, period);

    let mut breakdown = aggregate(&records, &segments, &[Dimension::Platform], period);
    let dropped = breakdown.remove(0);
    assert!(dropped.dispute_count > 1);

    let report = reconcile_breakdown("platform", &overall, &breakdown, &ReconciliationConfig::default());
    assert!(!report.passed());

    let total = report
        .checks
        .iter()
        .find(|c| c.metric == "total_disputes")
        .expect("dispute count is always checked");
    assert_eq!(total.kind, MetricKind::Count);
    assert!(!total.check.passed);
    assert_eq!(total.check.diff, Decimal::from(dropped.dispute_count));
    assert_eq!(total.overall - total.breakdown_sum, total.check.diff);
}
