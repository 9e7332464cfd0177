//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use recovery_core::{
    record::{DisputeRecord, ExternalStatus},
    synthetic::{generate, SyntheticConfig},
    types::DateRange,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(date(start), date(end))
}

/// An accepted inaccurate-order dispute with zero amounts. Override fields
/// with struct update syntax.
pub fn dispute(chain: &str, b_name: &str, on: &str) -> DisputeRecord {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let chain = if chain.is_empty() { None } else { Some(chain.to_string()) };
    DisputeRecord {
        dispute_id: format!("d-{id:06}"),
        slug: format!("doordash-{}", b_name.to_ascii_lowercase().replace(' ', "-")),
        chain,
        b_name: b_name.to_string(),
        platform: "Doordash".to_string(),
        order_date: date(on),
        dispute_date: date(on),
        external_status: ExternalStatus::Accepted,
        raised: true,
        error_category: "Inaccurate Order".to_string(),
        error_subcategory: "Missing Item".to_string(),
        won_amount: Decimal::ZERO,
        refund_amount: Decimal::ZERO,
        order_subtotal: dec!(25),
    }
}

/// A settled inaccurate-order dispute: accepted when `won` is positive,
/// denied otherwise.
pub fn settled(chain: &str, on: &str, won: Decimal, refund: Decimal) -> DisputeRecord {
    let status = if won > Decimal::ZERO {
        ExternalStatus::Accepted
    } else {
        ExternalStatus::Denied
    };
    DisputeRecord {
        external_status: status,
        won_amount: won,
        refund_amount: refund,
        ..dispute(chain, &format!("{chain} #01"), on)
    }
}

/// `n` distinct locations for `chain`, one dispute each, all on `on`.
pub fn locations(chain: &str, n: usize, on: &str) -> Vec<DisputeRecord> {
    (1..=n)
        .map(|i| dispute(chain, &format!("{chain} #{i:03}"), on))
        .collect()
}

/// A small synthetic history: 15 disputes a day across 30 chains.
pub fn synthetic(seed: u64, start: &str, end: &str) -> Vec<DisputeRecord> {
    let mut config = SyntheticConfig::new(seed, range(start, end));
    config.chain_count = 30;
    config.disputes_per_day = 15;
    generate(&config)
}
