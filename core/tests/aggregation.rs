//! Integration tests for the aggregator.
//!
//! 1. Breakdowns sum exactly to the overall
//! 2. Output order follows the group key, not the input
//! 3. Value bracket edges are inclusive upper bounds
//! 4. Platform whitespace, slugs and missing chains are handled

mod common;

use common::{date, dispute, locations, range, settled, synthetic};
use recovery_core::{
    aggregate::{aggregate, aggregate_overall, Dimension, GroupValue, ValueBracket},
    config::SegmentationConfig,
    record::{DisputeRecord, ExternalStatus},
    segmentation::{compute_segments, Segment, SegmentMap},
    types::YearMonth,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ─────────────────────────────────────────────────────────────────────────────
// Additivity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn every_breakdown_sums_exactly_to_the_overall() {
    let records = synthetic(3, "2025-01-01", "2025-03-31");
    let segments = compute_segments(&records, date("2025-03-31"), &SegmentationConfig::default());
    let period = range("2025-01-01", "2025-03-31");
    let overall = aggregate_overall(&records, period);
    assert!(overall.dispute_count > 0);

    for dim in [
        Dimension::Platform,
        Dimension::Chain,
        Dimension::Segment,
        Dimension::Month,
        Dimension::ValueBracket,
        Dimension::Subcategory,
    ] {
        let groups = aggregate(&records, &segments, &[dim], period);
        let count: usize = groups.iter().map(|g| g.dispute_count).sum();
        let won: Decimal = groups.iter().map(|g| g.metrics.won).sum();
        let settled: Decimal = groups.iter().map(|g| g.metrics.settled).sum();
        let pending: Decimal = groups.iter().map(|g| g.metrics.pending).sum();
        let contested: Decimal = groups.iter().map(|g| g.metrics.contested).sum();
        let accepted: usize = groups.iter().map(|g| g.status_counts.won()).sum();

        assert_eq!(count, overall.dispute_count, "{dim:?} dispute count");
        assert_eq!(won, overall.metrics.won, "{dim:?} won");
        assert_eq!(settled, overall.metrics.settled, "{dim:?} settled");
        assert_eq!(pending, overall.metrics.pending, "{dim:?} pending");
        assert_eq!(contested, overall.metrics.contested, "{dim:?} contested");
        assert_eq!(accepted, overall.status_counts.won(), "{dim:?} won count");
    }
}

#[test]
fn status_counts_split_into_won_lost_pending() {
    let mk = |status: ExternalStatus| DisputeRecord {
        external_status: status,
        ..dispute("A", "A #1", "2025-01-10")
    };
    let records: Vec<DisputeRecord> = ExternalStatus::ALL.into_iter().map(mk).collect();
    let snap = aggregate_overall(&records, range("2025-01-01", "2025-01-31"));
    assert_eq!(snap.status_counts.won(), 1);
    assert_eq!(snap.status_counts.lost(), 1);
    assert_eq!(snap.status_counts.pending(), 3);
    assert_eq!(snap.status_counts.total(), snap.dispute_count);
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn groups_come_out_in_natural_key_order() {
    let records = vec![
        DisputeRecord { platform: "UberEats".into(), ..dispute("B", "B #1", "2025-03-02") },
        DisputeRecord { platform: "Grubhub".into(), ..dispute("A", "A #1", "2025-01-15") },
        DisputeRecord { platform: "Doordash".into(), ..dispute("C", "C #1", "2025-02-20") },
    ];
    let segments = SegmentMap::default();
    let period = range("2025-01-01", "2025-03-31");

    let platforms: Vec<String> = aggregate(&records, &segments, &[Dimension::Platform], period)
        .iter()
        .map(|s| s.label())
        .collect();
    assert_eq!(platforms, vec!["Doordash", "Grubhub", "UberEats"]);

    let months: Vec<GroupValue> = aggregate(&records, &segments, &[Dimension::Month], period)
        .into_iter()
        .map(|s| s.key[0].clone())
        .collect();
    assert_eq!(
        months,
        vec![
            GroupValue::Month(YearMonth::new(2025, 1)),
            GroupValue::Month(YearMonth::new(2025, 2)),
            GroupValue::Month(YearMonth::new(2025, 3)),
        ]
    );
}

#[test]
fn segments_order_from_p0_to_p4() {
    let mut records = locations("Big", 5, "2025-03-20");
    records.extend(locations("Small", 1, "2025-03-20"));
    records.push(dispute("Gone", "Gone #1", "2025-03-21"));

    // Census without "Gone" so it defaults to P4.
    let census: Vec<DisputeRecord> = records
        .iter()
        .filter(|r| r.chain_name() != Some("Gone"))
        .cloned()
        .collect();
    let segments = compute_segments(&census, date("2025-03-31"), &SegmentationConfig::default());

    let keys: Vec<GroupValue> =
        aggregate(&records, &segments, &[Dimension::Segment], range("2025-03-01", "2025-03-31"))
            .into_iter()
            .map(|s| s.key[0].clone())
            .collect();
    assert_eq!(keys, vec![GroupValue::Segment(Segment::P0), GroupValue::Segment(Segment::P4)]);
}

#[test]
fn multi_dimension_keys_sort_lexicographically() {
    let records = vec![
        DisputeRecord { platform: "UberEats".into(), ..dispute("A", "A #1", "2025-01-15") },
        DisputeRecord { platform: "Doordash".into(), ..dispute("A", "A #1", "2025-02-15") },
        DisputeRecord { platform: "Doordash".into(), ..dispute("A", "A #1", "2025-01-15") },
    ];
    let labels: Vec<String> = aggregate(
        &records,
        &SegmentMap::default(),
        &[Dimension::Platform, Dimension::Month],
        range("2025-01-01", "2025-02-28"),
    )
    .iter()
    .map(|s| s.label())
    .collect();
    assert_eq!(
        labels,
        vec!["Doordash / 2025-01", "Doordash / 2025-02", "UberEats / 2025-01"]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Value brackets
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bracket_upper_edges_are_inclusive() {
    let cases = [
        (dec!(0), ValueBracket::Upto20),
        (dec!(20.00), ValueBracket::Upto20),
        (dec!(20.01), ValueBracket::Upto40),
        (dec!(100), ValueBracket::Upto100),
        (dec!(100.01), ValueBracket::Upto150),
        (dec!(200), ValueBracket::Upto200),
        (dec!(200.01), ValueBracket::Over200),
    ];
    for (subtotal, expected) in cases {
        assert_eq!(ValueBracket::of(subtotal), expected, "subtotal {subtotal}");
    }
    assert_eq!(ValueBracket::Upto20.index(), 1);
    assert_eq!(ValueBracket::Over200.index(), 8);
    assert_eq!(ValueBracket::Upto20.label(), "$0-20");
    assert_eq!(ValueBracket::Over200.label(), "$200+");
}

#[test]
fn brackets_are_ordered_by_index() {
    let records: Vec<DisputeRecord> = [dec!(250), dec!(15), dec!(75)]
        .into_iter()
        .map(|subtotal| DisputeRecord {
            order_subtotal: subtotal,
            ..dispute("A", "A #1", "2025-01-10")
        })
        .collect();
    let labels: Vec<String> = aggregate(
        &records,
        &SegmentMap::default(),
        &[Dimension::ValueBracket],
        range("2025-01-01", "2025-01-31"),
    )
    .iter()
    .map(|s| s.label())
    .collect();
    assert_eq!(labels, vec!["$0-20", "$60-80", "$200+"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization and identity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn platform_whitespace_does_not_split_groups() {
    let records = vec![
        DisputeRecord { platform: "Doordash ".into(), ..dispute("A", "A #1", "2025-01-10") },
        DisputeRecord { platform: " Doordash".into(), ..dispute("A", "A #2", "2025-01-11") },
        DisputeRecord { platform: "Doordash".into(), ..dispute("A", "A #3", "2025-01-12") },
    ];
    let groups = aggregate(
        &records,
        &SegmentMap::default(),
        &[Dimension::Platform],
        range("2025-01-01", "2025-01-31"),
    );
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].dispute_count, 3);
}

#[test]
fn location_count_uses_chain_and_name_not_slug() {
    let records = vec![
        DisputeRecord { slug: "dd-1".into(), ..dispute("A", "A Main", "2025-01-10") },
        DisputeRecord { slug: "ue-1".into(), ..dispute("A", "A Main", "2025-01-11") },
        DisputeRecord { slug: "gh-1".into(), ..dispute("A", "A Main", "2025-01-12") },
        DisputeRecord { slug: "dd-2".into(), ..dispute("A", "A Elm", "2025-01-12") },
    ];
    let snap = aggregate_overall(&records, range("2025-01-01", "2025-01-31"));
    assert_eq!(snap.location_count, 2);
}

#[test]
fn chainless_rows_stay_in_aggregation_under_blank_chain() {
    let records = vec![
        settled("A", "2025-01-10", dec!(10), dec!(20)),
        DisputeRecord { won_amount: dec!(5), ..dispute("", "Orphan", "2025-01-11") },
    ];
    let groups = aggregate(
        &records,
        &SegmentMap::default(),
        &[Dimension::Chain],
        range("2025-01-01", "2025-01-31"),
    );
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, vec![GroupValue::Chain(String::new())]);
    assert_eq!(groups[0].metrics.won, dec!(5));
    assert_eq!(groups[0].location_count, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Ranges and derived metrics
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn date_range_is_inclusive_on_both_ends() {
    let records = vec![
        dispute("A", "A #1", "2024-12-31"),
        dispute("A", "A #1", "2025-01-01"),
        dispute("A", "A #1", "2025-01-31"),
        dispute("A", "A #1", "2025-02-01"),
    ];
    let snap = aggregate_overall(&records, range("2025-01-01", "2025-01-31"));
    assert_eq!(snap.dispute_count, 2);
}

#[test]
fn empty_range_gives_zero_overall() {
    let snap = aggregate_overall(&[], range("2025-01-01", "2025-01-31"));
    assert_eq!(snap.label(), "All");
    assert_eq!(snap.dispute_count, 0);
    assert_eq!(snap.recovery_per_location, Decimal::ZERO);
    assert_eq!(snap.avg_order_value, Decimal::ZERO);
    assert_eq!(snap.metrics.win_rate, Decimal::ZERO);
}

#[test]
fn recovery_per_location_and_average_order_value() {
    let records = vec![
        DisputeRecord {
            order_subtotal: dec!(30),
            ..settled("A", "2025-01-10", dec!(40), dec!(50))
        },
        DisputeRecord {
            b_name: "A #02".into(),
            order_subtotal: dec!(50),
            ..settled("A", "2025-01-11", dec!(20), dec!(50))
        },
        DisputeRecord {
            error_category: "Late Delivery".into(),
            order_subtotal: dec!(1000),
            ..dispute("A", "A #01", "2025-01-12")
        },
    ];
    let snap = aggregate_overall(&records, range("2025-01-01", "2025-01-31"));
    assert_eq!(snap.location_count, 2);
    assert_eq!(snap.recovery_per_location, dec!(30));
    // Only inaccurate-order disputes feed the average.
    assert_eq!(snap.inaccurate_count, 2);
    assert_eq!(snap.avg_order_value, dec!(40));
}
