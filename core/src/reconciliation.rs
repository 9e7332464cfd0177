//! Reconciliation checks. A breakdown's per-group sums must match an
//! independently computed overall total.
//!
//! Design:
//!   - diff = overall - Σ breakdown (signed, for display)
//!   - pass when |diff| <= tolerance
//!   - counts and dollars carry separate tolerances
//!   - a failed check is a diagnostic: logged, returned, never an error

use crate::{aggregate::AggregationSnapshot, config::ReconciliationConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconCheck {
    pub passed: bool,
    pub diff: Decimal,
}

/// Compare `overall` with the sum of `breakdown`.
pub fn check(overall: Decimal, breakdown: &[Decimal], tolerance: Decimal) -> ReconCheck {
    let sum: Decimal = breakdown.iter().copied().sum();
    let diff = overall - sum;
    ReconCheck {
        passed: diff.abs() <= tolerance,
        diff,
    }
}

/// Integer variant for dispute/location counts.
pub fn check_counts(overall: usize, breakdown: &[usize], tolerance: Decimal) -> ReconCheck {
    let parts: Vec<Decimal> = breakdown.iter().map(|c| Decimal::from(*c)).collect();
    check(Decimal::from(overall), &parts, tolerance)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Count,
    Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCheck {
    pub metric: String,
    pub kind: MetricKind,
    pub overall: Decimal,
    pub breakdown_sum: Decimal,
    pub check: ReconCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Name of the breakdown being checked, e.g. "platform".
    pub breakdown: String,
    pub checks: Vec<MetricCheck>,
}

impl ReconciliationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.check.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MetricCheck> {
        self.checks.iter().filter(|c| !c.check.passed)
    }
}

type Extract = fn(&AggregationSnapshot) -> Decimal;

/// Metrics that partition exactly across any non-overlapping breakdown.
/// Location counts are excluded: a location can appear in several groups.
fn additive_metrics() -> [(&'static str, MetricKind, Extract); 8] {
    [
        ("total_disputes", MetricKind::Count, |s: &AggregationSnapshot| Decimal::from(s.dispute_count)),
        ("won_count", MetricKind::Count, |s: &AggregationSnapshot| Decimal::from(s.status_counts.won())),
        ("lost_count", MetricKind::Count, |s: &AggregationSnapshot| Decimal::from(s.status_counts.lost())),
        ("pending_count", MetricKind::Count, |s: &AggregationSnapshot| Decimal::from(s.status_counts.pending())),
        ("total_recovered", MetricKind::Amount, |s: &AggregationSnapshot| s.metrics.won),
        ("total_settled", MetricKind::Amount, |s: &AggregationSnapshot| s.metrics.settled),
        ("total_pending", MetricKind::Amount, |s: &AggregationSnapshot| s.metrics.pending),
        ("total_contested", MetricKind::Amount, |s: &AggregationSnapshot| s.metrics.contested),
    ]
}

/// Check every additive metric of `breakdown` against `overall`.
pub fn reconcile_breakdown(
    name: &str,
    overall: &AggregationSnapshot,
    breakdown: &[AggregationSnapshot],
    config: &ReconciliationConfig,
) -> ReconciliationReport {
    let checks = additive_metrics()
        .into_iter()
        .map(|(metric, kind, extract)| {
            let tolerance = match kind {
                MetricKind::Count => config.count_tolerance,
                MetricKind::Amount => config.amount_tolerance,
            };
            let parts: Vec<Decimal> = breakdown.iter().map(|s| extract(s)).collect();
            let overall_value = extract(overall);
            let result = check(overall_value, &parts, tolerance);
            if !result.passed {
                log::warn!(
                    "reconciliation: {name} breakdown {metric} off by {} (overall {overall_value})",
                    result.diff
                );
            }
            MetricCheck {
                metric: metric.to_string(),
                kind,
                overall: overall_value,
                breakdown_sum: overall_value - result.diff,
                check: result,
            }
        })
        .collect();

    ReconciliationReport {
        breakdown: name.to_string(),
        checks,
    }
}
