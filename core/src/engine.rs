//! The report engine: runs one recovery scorecard against an injected source.
//!
//! EXECUTION ORDER (fixed):
//!   1. Census fetch     (raised orders in the trailing window ending `as_of`, all platforms)
//!   2. Segmentation
//!   3. Activity fetch   (one read covering period, previous period and trend history)
//!   4. Breakdowns       (overall, platform, segment, month, value bracket)
//!   5. Movement + deltas vs the previous period
//!   6. Declining chains (per chain and platform)
//!   7. Dispute timeliness over the period
//!   8. Reconciliation of every breakdown against the overall
//!
//! RULES:
//!   - The engine owns no data; everything comes through `DisputeSource`.
//!   - Segments come from the census only, never from the reported period.
//!   - A failed reconciliation is reported, never raised as an error.

use crate::{
    aggregate::{aggregate, aggregate_overall, AggregationSnapshot, Dimension},
    cohort::{build_cohort, CohortMatrix, CohortMetric},
    config::EngineConfig,
    error::RecoveryResult,
    filter::DisputeFilter,
    record::DisputeRecord,
    reconciliation::{reconcile_breakdown, ReconciliationReport},
    segmentation::{census_filter, compute_segments, ChainSegment, SegmentMap},
    source::DisputeSource,
    store::{RecoveryStore, ReportRunRow},
    timeliness::{analyze_timeliness, TimelinessReport},
    trend::{
        diff_with_segments, flag_declining, monthly_history, period_delta, DecliningEntity,
        MovementRecord, PeriodDelta,
    },
    types::{DateRange, YearMonth},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub as_of:           NaiveDate,
    pub period:          DateRange,
    pub previous_period: Option<DateRange>,
    /// Empty = the configured default platforms.
    #[serde(default)]
    pub platforms:       Vec<String>,
    #[serde(default)]
    pub chains:          Vec<String>,
    #[serde(default)]
    pub categories:      Vec<String>,
}

impl ReportRequest {
    /// Month-to-date report compared with the whole previous month.
    pub fn month_to_date(as_of: NaiveDate) -> Self {
        let month = YearMonth::of(as_of);
        let start = month.first_day().unwrap_or(as_of);
        Self {
            as_of,
            period: DateRange::new(start, as_of),
            previous_period: month.offset(-1).range(),
            platforms: Vec::new(),
            chains: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn with_platforms(mut self, platforms: &[&str]) -> Self {
        self.platforms = platforms.iter().map(|p| p.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub as_of:                  NaiveDate,
    pub period:                 DateRange,
    pub previous_period:        Option<DateRange>,
    pub segments:               Vec<ChainSegment>,
    pub dropped_census_records: usize,
    pub overall:                AggregationSnapshot,
    pub by_platform:            Vec<AggregationSnapshot>,
    pub by_segment:             Vec<AggregationSnapshot>,
    pub by_month:               Vec<AggregationSnapshot>,
    pub by_value_bracket:       Vec<AggregationSnapshot>,
    pub previous_overall:       Option<AggregationSnapshot>,
    pub platform_deltas:        Vec<PeriodDelta>,
    pub segment_deltas:         Vec<PeriodDelta>,
    pub chain_movement:         Vec<MovementRecord>,
    pub declining_chains:       Vec<DecliningEntity>,
    pub timeliness:             TimelinessReport,
    pub reconciliation:         Vec<ReconciliationReport>,
}

impl RecoveryReport {
    /// True when every breakdown reconciles with the overall.
    pub fn reconciled(&self) -> bool {
        self.reconciliation.iter().all(ReconciliationReport::passed)
    }
}

pub struct RecoveryEngine<S: DisputeSource> {
    source: S,
    config: EngineConfig,
}

impl<S: DisputeSource> RecoveryEngine<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Chain segments from the census window ending `as_of`.
    pub fn segments(&self, as_of: NaiveDate) -> RecoveryResult<SegmentMap> {
        let census = self
            .source
            .fetch_dispute_records(&census_filter(as_of, &self.config.segmentation))?;
        Ok(compute_segments(&census, as_of, &self.config.segmentation))
    }

    fn activity_filter(&self, request: &ReportRequest, range: DateRange) -> DisputeFilter {
        let platforms: Vec<String> = if request.platforms.is_empty() {
            self.config.default_platforms.clone()
        } else {
            request.platforms.clone()
        };
        DisputeFilter::for_range(range)
            .with_platforms(platforms)
            .with_chains(request.chains.iter().cloned())
            .with_categories(request.categories.iter().cloned())
    }

    /// Trend window: `long_window_months` whole months ending with the
    /// month of `as_of`.
    fn trend_range(&self, as_of: NaiveDate) -> DateRange {
        let long = self.config.trend.long_window_months as i32;
        let start = YearMonth::of(as_of)
            .offset(1 - long)
            .first_day()
            .unwrap_or(as_of);
        DateRange::new(start, as_of)
    }

    pub fn run_report(&self, request: &ReportRequest) -> RecoveryResult<RecoveryReport> {
        let segments = self.segments(request.as_of)?;

        let trend_range = self.trend_range(request.as_of);
        let mut starts = vec![request.period.start, trend_range.start];
        let mut ends = vec![request.period.end, trend_range.end];
        if let Some(prev) = request.previous_period {
            starts.push(prev.start);
            ends.push(prev.end);
        }
        let span = DateRange::new(
            starts.into_iter().min().unwrap_or(request.period.start),
            ends.into_iter().max().unwrap_or(request.period.end),
        );
        let records = self
            .source
            .fetch_dispute_records(&self.activity_filter(request, span))?;

        log::debug!(
            "engine: {} activity records over {}..={}, {} chains segmented",
            records.len(),
            span.start,
            span.end,
            segments.len()
        );

        let period = request.period;
        let overall = aggregate_overall(&records, period);
        let by_platform = aggregate(&records, &segments, &[Dimension::Platform], period);
        let by_segment = aggregate(&records, &segments, &[Dimension::Segment], period);
        let by_month = aggregate(&records, &segments, &[Dimension::Month], period);
        let by_value_bracket = aggregate(&records, &segments, &[Dimension::ValueBracket], period);

        let (previous_overall, platform_deltas, segment_deltas, chain_movement) =
            match request.previous_period {
                Some(prev) => {
                    let prev_platform = aggregate(&records, &segments, &[Dimension::Platform], prev);
                    let prev_segment = aggregate(&records, &segments, &[Dimension::Segment], prev);
                    let cur_chain = aggregate(&records, &segments, &[Dimension::Chain], period);
                    let prev_chain = aggregate(&records, &segments, &[Dimension::Chain], prev);
                    (
                        Some(aggregate_overall(&records, prev)),
                        period_delta(&by_platform, &prev_platform),
                        period_delta(&by_segment, &prev_segment),
                        diff_with_segments(&cur_chain, &prev_chain, &segments),
                    )
                }
                None => (None, Vec::new(), Vec::new(), Vec::new()),
            };

        let history = monthly_history(
            &records,
            &segments,
            &[Dimension::Chain, Dimension::Platform],
            trend_range,
        );
        let declining_chains =
            flag_declining(&history, YearMonth::of(request.as_of), &self.config.trend);

        let timeliness = analyze_timeliness(&records, period, &self.config.timeliness);

        let recon = &self.config.reconciliation;
        let reconciliation = vec![
            reconcile_breakdown("platform", &overall, &by_platform, recon),
            reconcile_breakdown("segment", &overall, &by_segment, recon),
            reconcile_breakdown("month", &overall, &by_month, recon),
            reconcile_breakdown("value_bracket", &overall, &by_value_bracket, recon),
        ];

        Ok(RecoveryReport {
            as_of: request.as_of,
            period,
            previous_period: request.previous_period,
            segments: segments.ranked().into_iter().cloned().collect(),
            dropped_census_records: segments.dropped_records(),
            overall,
            by_platform,
            by_segment,
            by_month,
            by_value_bracket,
            previous_overall,
            platform_deltas,
            segment_deltas,
            chain_movement,
            declining_chains,
            timeliness,
            reconciliation,
        })
    }

    /// Top-chain cohort pivot over the configured number of months ending
    /// with the month of `request.as_of`.
    pub fn cohort(&self, request: &ReportRequest, metric: CohortMetric) -> RecoveryResult<CohortMatrix> {
        let months = self.config.cohort.months.max(1) as i32;
        let start = YearMonth::of(request.as_of)
            .offset(1 - months)
            .first_day()
            .unwrap_or(request.as_of);
        let range = DateRange::new(start, request.as_of);

        let segments = self.segments(request.as_of)?;
        let records: Vec<DisputeRecord> = self
            .source
            .fetch_dispute_records(&self.activity_filter(request, range))?;
        Ok(build_cohort(
            &records,
            &segments,
            metric,
            self.config.cohort.top_n_chains,
            range,
        ))
    }
}

/// Persist a finished report as JSON. Returns the new run id.
pub fn save_report(store: &RecoveryStore, report: &RecoveryReport) -> RecoveryResult<String> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let row = ReportRunRow {
        run_id:       run_id.clone(),
        as_of:        report.as_of.to_string(),
        period_start: report.period.start.to_string(),
        period_end:   report.period.end.to_string(),
        report_json:  serde_json::to_string(report)?,
    };
    store.insert_report_run(&row)?;
    log::debug!("engine: saved report {run_id} for {}", report.as_of);
    Ok(run_id)
}

/// Load a previously saved report.
pub fn load_report(store: &RecoveryStore, run_id: &str) -> RecoveryResult<Option<RecoveryReport>> {
    match store.get_report_run(run_id)? {
        Some(row) => Ok(Some(serde_json::from_str(&row.report_json)?)),
        None => Ok(None),
    }
}
