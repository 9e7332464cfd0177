//! Dispute timeliness: whether inaccurate-order disputes were filed, and
//! whether they were filed inside the platform's filing window.
//!
//!   1. Filing status per platform: filed (ACCEPTED, DENIED, IN_PROGRESS)
//!      vs not filed (TO_BE_RAISED, EXPIRED)
//!   2. Expiry timing: dispute date on or before order date + window
//!
//! RULE: a chain-specific window beats the platform window, which beats
//! the configured default. Platform and chain match case-insensitively.

use crate::{
    config::{FilingWindow, TimelinessConfig},
    record::{DisputeRecord, ExternalStatus},
    types::DateRange,
};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryTiming {
    BeforeExpiry,
    AfterExpiry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTimeliness {
    pub platform: String,
    /// Platform-wide window; chain overrides are applied per record.
    pub window_days: u32,
    pub total_count: usize,
    pub filed_count: usize,
    pub not_filed_count: usize,
    /// filed / (filed + not filed), percent, full precision.
    pub on_time_pct: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryBucket {
    pub timing: ExpiryTiming,
    pub dispute_count: usize,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinessReport {
    /// Alphabetical by platform.
    pub by_platform: Vec<PlatformTimeliness>,
    /// Before expiry first. Empty buckets are omitted.
    pub expiry: Vec<ExpiryBucket>,
}

fn same(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn platform_window<'a>(config: &'a TimelinessConfig, platform: &str) -> Option<&'a FilingWindow> {
    config
        .windows
        .iter()
        .find(|w| w.chain.is_none() && same(&w.platform, platform))
}

/// Filing window, in days, that applies to `record`.
pub fn window_days(record: &DisputeRecord, config: &TimelinessConfig) -> u32 {
    let chain_specific = record.chain_name().and_then(|chain| {
        config.windows.iter().find(|w| {
            same(&w.platform, &record.platform)
                && w.chain.as_deref().is_some_and(|c| same(c, chain))
        })
    });
    chain_specific
        .or_else(|| platform_window(config, &record.platform))
        .map_or(config.default_window_days, |w| w.days)
}

/// Last day a dispute on this order can be filed.
pub fn expiry_date(record: &DisputeRecord, config: &TimelinessConfig) -> NaiveDate {
    record
        .order_date
        .checked_add_days(Days::new(u64::from(window_days(record, config))))
        .unwrap_or(NaiveDate::MAX)
}

pub fn timing_of(record: &DisputeRecord, config: &TimelinessConfig) -> ExpiryTiming {
    if record.dispute_date <= expiry_date(record, config) {
        ExpiryTiming::BeforeExpiry
    } else {
        ExpiryTiming::AfterExpiry
    }
}

fn is_filed(status: ExternalStatus) -> bool {
    matches!(
        status,
        ExternalStatus::Accepted | ExternalStatus::Denied | ExternalStatus::InProgress
    )
}

#[derive(Default)]
struct PlatformAccumulator {
    filed: usize,
    not_filed: usize,
    amount: Decimal,
}

/// Timeliness of the inaccurate-order disputes whose `dispute_date` falls
/// inside `date_range`.
pub fn analyze_timeliness(
    records: &[DisputeRecord],
    date_range: DateRange,
    config: &TimelinessConfig,
) -> TimelinessReport {
    let mut platforms: BTreeMap<String, PlatformAccumulator> = BTreeMap::new();
    let mut expiry: BTreeMap<ExpiryTiming, (usize, Decimal)> = BTreeMap::new();

    let in_scope = records
        .iter()
        .filter(|r| date_range.contains(r.dispute_date) && r.is_inaccurate());

    for record in in_scope {
        let acc = platforms
            .entry(record.platform.trim().to_string())
            .or_default();
        if is_filed(record.external_status) {
            acc.filed += 1;
        } else {
            acc.not_filed += 1;
        }
        acc.amount += record.refund_amount;

        let bucket = expiry.entry(timing_of(record, config)).or_default();
        bucket.0 += 1;
        bucket.1 += record.refund_amount;
    }

    let by_platform: Vec<PlatformTimeliness> = platforms
        .into_iter()
        .map(|(platform, acc)| {
            let total = acc.filed + acc.not_filed;
            let on_time_pct = Decimal::from(acc.filed)
                .checked_mul(dec!(100))
                .and_then(|n| n.checked_div(Decimal::from(total)))
                .unwrap_or(Decimal::ZERO);
            PlatformTimeliness {
                window_days: platform_window(config, &platform)
                    .map_or(config.default_window_days, |w| w.days),
                platform,
                total_count: total,
                filed_count: acc.filed,
                not_filed_count: acc.not_filed,
                on_time_pct,
                total_amount: acc.amount,
            }
        })
        .collect();

    let expiry: Vec<ExpiryBucket> = expiry
        .into_iter()
        .map(|(timing, (dispute_count, total_amount))| ExpiryBucket {
            timing,
            dispute_count,
            total_amount,
        })
        .collect();

    log::debug!(
        "timeliness: {} platforms, {} expiry buckets for {}..={}",
        by_platform.len(),
        expiry.len(),
        date_range.start,
        date_range.end
    );

    TimelinessReport { by_platform, expiry }
}
