//! Movement and trend detection over aggregation snapshots.
//!
//!   1. Movement: which entities entered or left the active population
//!      between two periods
//!   2. Declining win rate: short-window average vs long-window average
//!   3. Period deltas: scorecard month-over-month changes per group
//!
//! Entities that do not qualify for a report are dropped silently.

use crate::{
    aggregate::{aggregate, AggregationSnapshot, Dimension, GroupValue},
    config::TrendConfig,
    record::DisputeRecord,
    segmentation::{Segment, SegmentMap},
    types::{DateRange, YearMonth},
    win_rate::win_rate,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Movement ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entered,
    Exited,
    Stayed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub entity_key: String,
    pub movement_type: MovementType,
    /// Filled in by `diff_with_segments`; unmapped chains read as P4.
    pub segment: Option<Segment>,
    pub location_count: usize,
}

/// Full outer join of two entity sets. Returns every entity, stayed included.
fn classify(current: &BTreeSet<String>, previous: &BTreeSet<String>) -> Vec<MovementRecord> {
    current
        .union(previous)
        .map(|key| {
            let movement_type = match (current.contains(key), previous.contains(key)) {
                (true, false) => MovementType::Entered,
                (false, true) => MovementType::Exited,
                _ => MovementType::Stayed,
            };
            MovementRecord {
                entity_key: key.clone(),
                movement_type,
                segment: None,
                location_count: 0,
            }
        })
        .collect()
}

/// Entities entering or exiting between two entity sets, sorted by
/// movement type then key. Stayed entities are not returned.
pub fn diff_entities(current: &BTreeSet<String>, previous: &BTreeSet<String>) -> Vec<MovementRecord> {
    let all = classify(current, previous);
    let stayed = all
        .iter()
        .filter(|m| m.movement_type == MovementType::Stayed)
        .count();
    log::debug!(
        "movement: {} current, {} previous, {} stayed",
        current.len(),
        previous.len(),
        stayed
    );

    let mut moved: Vec<MovementRecord> = all
        .into_iter()
        .filter(|m| m.movement_type != MovementType::Stayed)
        .collect();
    moved.sort_by(|a, b| {
        a.movement_type
            .cmp(&b.movement_type)
            .then_with(|| a.entity_key.cmp(&b.entity_key))
    });
    moved
}

fn entity_set(snapshots: &[AggregationSnapshot]) -> BTreeSet<String> {
    snapshots
        .iter()
        .filter(|s| s.dispute_count > 0)
        .map(AggregationSnapshot::label)
        .filter(|label| !label.is_empty())
        .collect()
}

/// Compare two snapshot lists keyed on their group label.
pub fn diff_snapshots(
    current: &[AggregationSnapshot],
    previous: &[AggregationSnapshot],
) -> Vec<MovementRecord> {
    diff_entities(&entity_set(current), &entity_set(previous))
}

/// Chain movement annotated with the current segment map, ordered by
/// segment, movement type, then largest chains first.
pub fn diff_with_segments(
    current: &[AggregationSnapshot],
    previous: &[AggregationSnapshot],
    segments: &SegmentMap,
) -> Vec<MovementRecord> {
    let mut moved = diff_snapshots(current, previous);
    for m in &mut moved {
        m.segment = Some(segments.segment_of(&m.entity_key));
        m.location_count = segments.location_count_of(&m.entity_key);
    }
    moved.sort_by(|a, b| {
        a.segment
            .cmp(&b.segment)
            .then_with(|| a.movement_type.cmp(&b.movement_type))
            .then_with(|| b.location_count.cmp(&a.location_count))
            .then_with(|| a.entity_key.cmp(&b.entity_key))
    });
    moved
}

// ── Monthly history ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub won: Decimal,
    pub settled: Decimal,
    pub win_rate: Decimal,
}

/// Entity → chronologically ordered monthly points.
pub type EntityHistory = BTreeMap<String, Vec<MonthlyPoint>>;

/// Build per-entity monthly win-rate series. The entity is the combination
/// of `entity_dims` (e.g. chain and platform), labelled like a snapshot key
/// ("Chain A / Doordash"). Months with nothing settled carry no win rate and
/// are left out, as are rows with any blank coordinate (e.g. disputes
/// missing their chain).
pub fn monthly_history(
    records: &[DisputeRecord],
    segments: &SegmentMap,
    entity_dims: &[Dimension],
    date_range: DateRange,
) -> EntityHistory {
    let mut group_by = entity_dims.to_vec();
    group_by.push(Dimension::Month);

    let mut history = EntityHistory::new();
    for snap in aggregate(records, segments, &group_by, date_range) {
        let Some((GroupValue::Month(month), entity)) = snap.key.split_last() else {
            continue;
        };
        let names: Vec<String> = entity.iter().map(GroupValue::entity_name).collect();
        if names.is_empty() || names.iter().any(String::is_empty) {
            continue;
        }
        if snap.metrics.settled <= Decimal::ZERO {
            continue;
        }
        history.entry(names.join(" / ")).or_default().push(MonthlyPoint {
            month: *month,
            won: snap.metrics.won,
            settled: snap.metrics.settled,
            win_rate: snap.metrics.win_rate,
        });
    }
    history
}

// ── Declining win rate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecliningEntity {
    pub entity_key: String,
    pub long_avg_win_rate: Decimal,
    pub short_avg_win_rate: Decimal,
    /// long - short, in percentage points.
    pub decline_points: Decimal,
    /// Decline relative to the long average, in percent.
    pub decline_pct: Decimal,
    pub months_of_data: usize,
    pub long_settled: Decimal,
    pub severity: Severity,
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values
        .iter()
        .sum::<Decimal>()
        .checked_div(Decimal::from(values.len()))
        .unwrap_or(Decimal::ZERO)
}

/// Flag entities whose recent win rate fell well below their longer-run
/// average. Both windows end on `as_of` (inclusive).
pub fn flag_declining(
    history: &EntityHistory,
    as_of: YearMonth,
    config: &TrendConfig,
) -> Vec<DecliningEntity> {
    let long_start = as_of.offset(1 - config.long_window_months as i32);
    let short_start = as_of.offset(1 - config.short_window_months as i32);

    let mut flagged = Vec::new();

    for (entity, points) in history {
        let long: Vec<&MonthlyPoint> = points
            .iter()
            .filter(|p| p.month >= long_start && p.month <= as_of)
            .collect();
        if long.len() < config.min_months {
            continue;
        }

        let long_rates: Vec<Decimal> = long.iter().map(|p| p.win_rate).collect();
        let short_rates: Vec<Decimal> = long
            .iter()
            .filter(|p| p.month >= short_start)
            .map(|p| p.win_rate)
            .collect();

        let long_avg = mean(&long_rates);
        let short_avg = mean(&short_rates);
        if long_avg <= Decimal::ZERO || short_avg <= Decimal::ZERO {
            continue;
        }

        let long_settled: Decimal = long.iter().map(|p| p.settled).sum();
        if long_settled <= config.min_settled_volume {
            continue;
        }

        let decline_points = long_avg - short_avg;
        let decline_pct = decline_points
            .checked_mul(dec!(100))
            .and_then(|n| n.checked_div(long_avg))
            .unwrap_or(Decimal::ZERO);
        if decline_pct < config.threshold_pct {
            continue;
        }

        let severity = if decline_pct > config.critical_pct {
            Severity::Critical
        } else {
            Severity::Warning
        };

        flagged.push(DecliningEntity {
            entity_key: entity.clone(),
            long_avg_win_rate: long_avg,
            short_avg_win_rate: short_avg,
            decline_points,
            decline_pct,
            months_of_data: long.len(),
            long_settled,
            severity,
        });
    }

    flagged.sort_by(|a, b| {
        b.decline_pct
            .cmp(&a.decline_pct)
            .then_with(|| a.entity_key.cmp(&b.entity_key))
    });

    log::debug!("trend: {} of {} entities flagged as declining", flagged.len(), history.len());
    flagged
}

// ── Period deltas ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDelta {
    pub entity_key: String,
    pub current_disputes: usize,
    pub previous_disputes: usize,
    pub won_change: Decimal,
    pub settled_change: Decimal,
    /// Change in win rate, percentage points.
    pub win_rate_change: Decimal,
}

/// Per-group change from `previous` to `current`. Groups present on only one
/// side compare against zero.
pub fn period_delta(
    current: &[AggregationSnapshot],
    previous: &[AggregationSnapshot],
) -> Vec<PeriodDelta> {
    let cur: BTreeMap<String, &AggregationSnapshot> =
        current.iter().map(|s| (s.label(), s)).collect();
    let prev: BTreeMap<String, &AggregationSnapshot> =
        previous.iter().map(|s| (s.label(), s)).collect();

    let keys: BTreeSet<&String> = cur.keys().chain(prev.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let (c_won, c_settled, c_count) = cur
                .get(key)
                .map_or((Decimal::ZERO, Decimal::ZERO, 0), |s| {
                    (s.metrics.won, s.metrics.settled, s.dispute_count)
                });
            let (p_won, p_settled, p_count) = prev
                .get(key)
                .map_or((Decimal::ZERO, Decimal::ZERO, 0), |s| {
                    (s.metrics.won, s.metrics.settled, s.dispute_count)
                });
            PeriodDelta {
                entity_key: key.clone(),
                current_disputes: c_count,
                previous_disputes: p_count,
                won_change: c_won - p_won,
                settled_change: c_settled - p_settled,
                win_rate_change: win_rate(c_won, c_settled) - win_rate(p_won, p_settled),
            }
        })
        .collect()
}
