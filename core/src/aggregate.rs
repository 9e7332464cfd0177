//! Aggregator: groups dispute records by any combination of dimensions
//! and runs the win-rate calculator per group.
//!
//! Output order is the natural order of the group key, never input order:
//!   platform / chain / subcategory → alphabetical
//!   segment                        → P0..P4
//!   month                          → chronological
//!   value bracket                  → bracket index

use crate::{
    record::{DisputeRecord, ExternalStatus, LocationKey},
    segmentation::{Segment, SegmentMap},
    types::{DateRange, YearMonth},
    win_rate::{WinRateMetrics, WinRateTally},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Platform,
    Chain,
    Segment,
    Month,
    ValueBracket,
    Subcategory,
}

/// Order-subtotal buckets. Upper edges are inclusive: $20.00 is "$0-20".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueBracket {
    Upto20,
    Upto40,
    Upto60,
    Upto80,
    Upto100,
    Upto150,
    Upto200,
    Over200,
}

impl ValueBracket {
    pub const ALL: [ValueBracket; 8] = [
        ValueBracket::Upto20,
        ValueBracket::Upto40,
        ValueBracket::Upto60,
        ValueBracket::Upto80,
        ValueBracket::Upto100,
        ValueBracket::Upto150,
        ValueBracket::Upto200,
        ValueBracket::Over200,
    ];

    pub fn of(subtotal: Decimal) -> Self {
        let edges = [
            (dec!(20), ValueBracket::Upto20),
            (dec!(40), ValueBracket::Upto40),
            (dec!(60), ValueBracket::Upto60),
            (dec!(80), ValueBracket::Upto80),
            (dec!(100), ValueBracket::Upto100),
            (dec!(150), ValueBracket::Upto150),
            (dec!(200), ValueBracket::Upto200),
        ];
        edges
            .into_iter()
            .find(|(edge, _)| subtotal <= *edge)
            .map_or(ValueBracket::Over200, |(_, b)| b)
    }

    /// 1-based display order.
    pub fn index(&self) -> usize {
        *self as usize + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValueBracket::Upto20  => "$0-20",
            ValueBracket::Upto40  => "$20-40",
            ValueBracket::Upto60  => "$40-60",
            ValueBracket::Upto80  => "$60-80",
            ValueBracket::Upto100 => "$80-100",
            ValueBracket::Upto150 => "$100-150",
            ValueBracket::Upto200 => "$150-200",
            ValueBracket::Over200 => "$200+",
        }
    }
}

/// One coordinate of a group key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "snake_case")]
pub enum GroupValue {
    Platform(String),
    Chain(String),
    Segment(Segment),
    Month(YearMonth),
    ValueBracket(ValueBracket),
    Subcategory(String),
}

impl GroupValue {
    fn of(record: &DisputeRecord, dimension: Dimension, segments: &SegmentMap) -> Self {
        match dimension {
            Dimension::Platform => GroupValue::Platform(record.platform.trim().to_string()),
            Dimension::Chain => {
                GroupValue::Chain(record.chain_name().unwrap_or_default().to_string())
            }
            Dimension::Segment => {
                GroupValue::Segment(segments.segment_of(record.chain_name().unwrap_or_default()))
            }
            Dimension::Month => GroupValue::Month(record.dispute_month()),
            Dimension::ValueBracket => {
                GroupValue::ValueBracket(ValueBracket::of(record.order_subtotal))
            }
            Dimension::Subcategory => {
                GroupValue::Subcategory(record.error_subcategory.trim().to_string())
            }
        }
    }

    /// Entity name used by movement and trend reports.
    pub fn entity_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Platform(s) | GroupValue::Chain(s) | GroupValue::Subcategory(s) => {
                f.write_str(s)
            }
            GroupValue::Segment(s) => write!(f, "{s}"),
            GroupValue::Month(m) => write!(f, "{m}"),
            GroupValue::ValueBracket(b) => f.write_str(b.label()),
        }
    }
}

pub type GroupKey = Vec<GroupValue>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub accepted: usize,
    pub denied: usize,
    pub in_progress: usize,
    pub to_be_raised: usize,
    pub expired: usize,
}

impl StatusCounts {
    fn add(&mut self, status: ExternalStatus) {
        match status {
            ExternalStatus::Accepted   => self.accepted += 1,
            ExternalStatus::Denied     => self.denied += 1,
            ExternalStatus::InProgress => self.in_progress += 1,
            ExternalStatus::ToBeRaised => self.to_be_raised += 1,
            ExternalStatus::Expired    => self.expired += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.accepted + self.denied + self.in_progress + self.to_be_raised + self.expired
    }

    /// Accepted disputes.
    pub fn won(&self) -> usize {
        self.accepted
    }

    /// Denied disputes.
    pub fn lost(&self) -> usize {
        self.denied
    }

    /// Everything not yet ruled on.
    pub fn pending(&self) -> usize {
        self.in_progress + self.to_be_raised + self.expired
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSnapshot {
    pub key: GroupKey,
    pub date_range: DateRange,
    pub dispute_count: usize,
    pub inaccurate_count: usize,
    pub status_counts: StatusCounts,
    pub metrics: WinRateMetrics,
    /// Distinct (chain, b_name) pairs. Never a slug count.
    pub location_count: usize,
    /// won / location_count, zero when there are no locations.
    pub recovery_per_location: Decimal,
    /// Mean subtotal of inaccurate-order disputes, zero when none.
    pub avg_order_value: Decimal,
}

impl AggregationSnapshot {
    /// Display name of the key, coordinates joined with " / ".
    pub fn label(&self) -> String {
        if self.key.is_empty() {
            return "All".to_string();
        }
        self.key
            .iter()
            .map(GroupValue::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Default)]
struct GroupAccumulator {
    dispute_count: usize,
    inaccurate_count: usize,
    status_counts: StatusCounts,
    tally: WinRateTally,
    locations: HashSet<LocationKey>,
    inaccurate_subtotal: Decimal,
}

impl GroupAccumulator {
    fn add(&mut self, record: &DisputeRecord) {
        self.dispute_count += 1;
        self.status_counts.add(record.external_status);
        self.tally.add(record);
        if let Some(key) = record.location_key() {
            self.locations.insert(key);
        }
        if record.is_inaccurate() {
            self.inaccurate_count += 1;
            self.inaccurate_subtotal += record.order_subtotal;
        }
    }

    fn finish(self, key: GroupKey, date_range: DateRange) -> AggregationSnapshot {
        let metrics = self.tally.finish();
        let location_count = self.locations.len();
        let recovery_per_location = per_unit(metrics.won, location_count);
        let avg_order_value = per_unit(self.inaccurate_subtotal, self.inaccurate_count);
        AggregationSnapshot {
            key,
            date_range,
            dispute_count: self.dispute_count,
            inaccurate_count: self.inaccurate_count,
            status_counts: self.status_counts,
            metrics,
            location_count,
            recovery_per_location,
            avg_order_value,
        }
    }
}

/// `amount / count`, zero for an empty denominator.
pub fn per_unit(amount: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    amount
        .checked_div(Decimal::from(count))
        .unwrap_or(Decimal::ZERO)
}

/// Group `records` falling inside `date_range` by `group_by` and compute
/// one snapshot per non-empty group.
pub fn aggregate(
    records: &[DisputeRecord],
    segments: &SegmentMap,
    group_by: &[Dimension],
    date_range: DateRange,
) -> Vec<AggregationSnapshot> {
    let mut groups: BTreeMap<GroupKey, GroupAccumulator> = BTreeMap::new();

    for record in records.iter().filter(|r| date_range.contains(r.dispute_date)) {
        let key: GroupKey = group_by
            .iter()
            .map(|d| GroupValue::of(record, *d, segments))
            .collect();
        groups.entry(key).or_default().add(record);
    }

    log::debug!(
        "aggregate: {} groups over {:?} for {}..={}",
        groups.len(),
        group_by,
        date_range.start,
        date_range.end
    );

    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key, date_range))
        .collect()
}

/// Single ungrouped snapshot for `date_range`. Always returned, zero-valued
/// when no records fall inside the range.
pub fn aggregate_overall(records: &[DisputeRecord], date_range: DateRange) -> AggregationSnapshot {
    let mut acc = GroupAccumulator::default();
    for record in records.iter().filter(|r| date_range.contains(r.dispute_date)) {
        acc.add(record);
    }
    acc.finish(Vec::new(), date_range)
}
