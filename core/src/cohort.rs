//! Chain × month cohort matrices for the largest chains.

use crate::{
    aggregate::{aggregate, AggregationSnapshot, Dimension, GroupValue},
    record::DisputeRecord,
    segmentation::SegmentMap,
    types::{DateRange, YearMonth},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortMetric {
    /// Won dollars per distinct location; chains ranked by total won.
    RecoveryPerLocation,
    /// Monthly win rate; chains ranked by total settled.
    WinRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    pub chain: String,
    /// Ranking basis over the whole range.
    pub total: Decimal,
    /// One cell per column month; `None` where the chain had no activity.
    pub cells: Vec<Option<Decimal>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMatrix {
    pub metric: CohortMetric,
    pub months: Vec<YearMonth>,
    pub rows: Vec<CohortRow>,
}

impl CohortMatrix {
    pub fn cell(&self, chain: &str, month: YearMonth) -> Option<Decimal> {
        let col = self.months.iter().position(|m| *m == month)?;
        self.rows
            .iter()
            .find(|r| r.chain == chain)
            .and_then(|r| r.cells[col])
    }
}

fn cell_value(snap: &AggregationSnapshot, metric: CohortMetric) -> Option<Decimal> {
    match metric {
        CohortMetric::RecoveryPerLocation => Some(snap.recovery_per_location),
        CohortMetric::WinRate if snap.metrics.settled > Decimal::ZERO => Some(snap.metrics.win_rate),
        CohortMetric::WinRate => None,
    }
}

fn basis(snap: &AggregationSnapshot, metric: CohortMetric) -> Decimal {
    match metric {
        CohortMetric::RecoveryPerLocation => snap.metrics.won,
        CohortMetric::WinRate => snap.metrics.settled,
    }
}

/// Pivot the top `top_n` chains (by total basis over `date_range`) into a
/// chain × month matrix. Records without a chain are ignored.
pub fn build_cohort(
    records: &[DisputeRecord],
    segments: &SegmentMap,
    metric: CohortMetric,
    top_n: usize,
    date_range: DateRange,
) -> CohortMatrix {
    let attributed: Vec<DisputeRecord> = records
        .iter()
        .filter(|r| r.chain_name().is_some())
        .cloned()
        .collect();

    let mut totals: Vec<(String, Decimal)> =
        aggregate(&attributed, segments, &[Dimension::Chain], date_range)
            .iter()
            .map(|s| (s.label(), basis(s, metric)))
            .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals.truncate(top_n);

    let chosen: BTreeSet<&str> = totals.iter().map(|(c, _)| c.as_str()).collect();

    let mut cells: BTreeMap<(String, YearMonth), Decimal> = BTreeMap::new();
    let mut months: BTreeSet<YearMonth> = BTreeSet::new();
    for snap in aggregate(&attributed, segments, &[Dimension::Chain, Dimension::Month], date_range) {
        let [GroupValue::Chain(chain), GroupValue::Month(month)] = snap.key.as_slice() else {
            continue;
        };
        if !chosen.contains(chain.as_str()) {
            continue;
        }
        months.insert(*month);
        if let Some(v) = cell_value(&snap, metric) {
            cells.insert((chain.clone(), *month), v);
        }
    }

    let months: Vec<YearMonth> = months.into_iter().collect();
    let rows = totals
        .into_iter()
        .map(|(chain, total)| {
            let row_cells = months
                .iter()
                .map(|m| cells.get(&(chain.clone(), *m)).copied())
                .collect();
            CohortRow {
                chain,
                total,
                cells: row_cells,
            }
        })
        .collect();

    CohortMatrix { metric, months, rows }
}
