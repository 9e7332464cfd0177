//! recovery-report: headless recovery scorecard.
//!
//! Usage:
//!   recovery-report --seed 12345 --months 13
//!   recovery-report --db disputes.db --as-of 2025-06-15 --json
//!   recovery-report --seed 7 --cohort

use anyhow::Result;
use chrono::NaiveDate;
use recovery_core::{
    aggregate::AggregationSnapshot,
    cohort::{CohortMatrix, CohortMetric},
    config::EngineConfig,
    engine::{save_report, RecoveryEngine, RecoveryReport, ReportRequest},
    store::RecoveryStore,
    synthetic::{generate, SyntheticConfig},
    types::{DateRange, YearMonth},
    win_rate::present_pct,
};
use std::env;

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    run_id: &'a str,
    report: &'a RecoveryReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    cohort: Option<&'a CohortMatrix>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let months = parse_arg(&args, "--months", 13u32);
    let json = args.iter().any(|a| a == "--json");
    let with_cohort = args.iter().any(|a| a == "--cohort");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    let as_of_arg = str_arg(&args, "--as-of");

    let config = match EngineConfig::load(data_dir) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{e}; using built-in defaults");
            EngineConfig::default()
        }
    };

    let store = RecoveryStore::open(db)?;
    store.migrate()?;

    // An empty database gets a synthetic history so the report has something to show.
    if store.dispute_count()? == 0 {
        let end = match as_of_arg {
            Some(s) => parse_date(s)?,
            None => chrono::Local::now().date_naive(),
        };
        let start = YearMonth::of(end)
            .offset(1 - months.max(1) as i32)
            .first_day()
            .unwrap_or(end);
        let records = generate(&SyntheticConfig::new(seed, DateRange::new(start, end)));
        let inserted = store.insert_disputes(&records)?;
        log::info!("seeded {inserted} synthetic disputes (seed {seed})");
    }

    let as_of = match as_of_arg {
        Some(s) => parse_date(s)?,
        None => store
            .latest_dispute_date()?
            .ok_or_else(|| anyhow::anyhow!("no disputes on file and no --as-of given"))?,
    };

    if !json {
        println!("Recovery Metrics: recovery-report");
        println!("  db:        {db}");
        println!("  as_of:     {as_of}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let request = ReportRequest::month_to_date(as_of);
    let engine = RecoveryEngine::new(&store, config);
    let report = engine.run_report(&request)?;
    let cohort = if with_cohort {
        Some(engine.cohort(&request, CohortMetric::RecoveryPerLocation)?)
    } else {
        None
    };
    let run_id = save_report(&store, &report)?;

    if json {
        let out = JsonOutput {
            run_id: &run_id,
            report: &report,
            cohort: cohort.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&run_id, &report);
        if let Some(matrix) = &cohort {
            print_cohort(matrix);
        }
    }

    Ok(())
}

fn print_snapshot_row(snap: &AggregationSnapshot) {
    println!(
        "  {:<16} disputes {:>6} | won ${:>11} | settled ${:>11} | win rate {:>6}% | locations {:>4}",
        snap.label(),
        snap.dispute_count,
        snap.metrics.won.round_dp(2).to_string(),
        snap.metrics.settled.round_dp(2).to_string(),
        present_pct(snap.metrics.win_rate).to_string(),
        snap.location_count,
    );
}

fn print_summary(run_id: &str, report: &RecoveryReport) {
    println!("=== SCORECARD {}..={} ===", report.period.start, report.period.end);
    println!("  run_id:   {run_id}");
    print_snapshot_row(&report.overall);
    println!(
        "  lost ${} | pending ${} | contested ${} | avg order ${}",
        report.overall.metrics.lost.round_dp(2),
        report.overall.metrics.pending.round_dp(2),
        report.overall.metrics.contested.round_dp(2),
        report.overall.avg_order_value.round_dp(2),
    );
    if let Some(prev) = &report.previous_overall {
        println!(
            "  vs previous period: win rate {}% -> {}%",
            present_pct(prev.metrics.win_rate),
            present_pct(report.overall.metrics.win_rate),
        );
    }

    println!();
    println!("=== BY PLATFORM ===");
    report.by_platform.iter().for_each(print_snapshot_row);

    println!();
    println!("=== BY SEGMENT ({} chains ranked) ===", report.segments.len());
    report.by_segment.iter().for_each(print_snapshot_row);
    if report.dropped_census_records > 0 {
        println!("  ({} census rows had no chain)", report.dropped_census_records);
    }

    println!();
    println!("=== CHAIN MOVEMENT ===");
    if report.chain_movement.is_empty() {
        println!("  (no chains entered or exited)");
    }
    for m in &report.chain_movement {
        let segment = m.segment.map(|s| s.to_string()).unwrap_or_default();
        println!(
            "  {segment:<3} {:?}: {} ({} locations)",
            m.movement_type, m.entity_key, m.location_count
        );
    }

    println!();
    println!("=== CHAINS NEEDING ATTENTION ===");
    if report.declining_chains.is_empty() {
        println!("  (none)");
    }
    for d in &report.declining_chains {
        println!(
            "  {:?} {}: {}% -> {}% ({}% decline over {} months)",
            d.severity,
            d.entity_key,
            present_pct(d.long_avg_win_rate),
            present_pct(d.short_avg_win_rate),
            present_pct(d.decline_pct),
            d.months_of_data,
        );
    }

    println!();
    println!("=== DISPUTE TIMELINESS ===");
    for p in &report.timeliness.by_platform {
        println!(
            "  {:<16} window {:>2}d | filed {:>5} | not filed {:>5} | on time {:>6}%",
            p.platform,
            p.window_days,
            p.filed_count,
            p.not_filed_count,
            present_pct(p.on_time_pct).to_string(),
        );
    }
    for b in &report.timeliness.expiry {
        println!(
            "  {:<16} {:>5} disputes | ${}",
            format!("{:?}", b.timing),
            b.dispute_count,
            b.total_amount.round_dp(2),
        );
    }

    println!();
    println!("=== RECONCILIATION ===");
    for r in &report.reconciliation {
        let status = if r.passed() { "PASS" } else { "FAIL" };
        println!("  {:<14} {status}", r.breakdown);
        for f in r.failures() {
            println!("    {} off by {}", f.metric, f.check.diff);
        }
    }
}

fn print_cohort(matrix: &CohortMatrix) {
    println!();
    println!("=== TOP CHAINS: RECOVERY PER LOCATION ===");
    let header: Vec<String> = matrix.months.iter().map(|m| format!("{:>9}", m.to_string())).collect();
    println!("  {:<16}{}", "chain", header.join(""));
    for row in &matrix.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|c| match c {
                Some(v) => format!("{:>9}", v.round_dp(2).to_string()),
                None => format!("{:>9}", "-"),
            })
            .collect();
        println!("  {:<16}{}", row.chain, cells.join(""));
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Cannot parse --as-of {s}: {e}"))
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
