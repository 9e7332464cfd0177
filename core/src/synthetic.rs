//! Synthetic dispute generator for demos and tests.
//!
//! Produces a realistic mix: a long tail of small chains, locations listed
//! on several platforms under different slugs, platform names with stray
//! whitespace, several spellings of the inaccurate-order category, and a
//! sprinkling of rows with no chain.

use crate::{
    record::{DisputeRecord, ExternalStatus},
    rng::{SeededRng, Stream},
    types::DateRange,
};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub chain_count: usize,
    pub max_locations_per_chain: u64,
    pub date_range: DateRange,
    pub disputes_per_day: u64,
    /// Share of rows with a blank chain.
    pub missing_chain_rate: f64,
}

impl SyntheticConfig {
    pub fn new(seed: u64, date_range: DateRange) -> Self {
        Self {
            seed,
            chain_count: 60,
            max_locations_per_chain: 40,
            date_range,
            disputes_per_day: 40,
            missing_chain_rate: 0.01,
        }
    }
}

const PLATFORMS: [(&str, f64); 4] = [
    ("Doordash", 0.50),
    ("UberEats", 0.30),
    ("Grubhub", 0.15),
    ("Doordash ", 0.05),
];

const CATEGORIES: [((&str, &str), f64); 6] = [
    (("Inaccurate Order", "Missing Item"), 0.40),
    (("INACCURATE_ORDER", "Wrong Item"), 0.15),
    (("inaccurate order", "Incorrect Quantity"), 0.10),
    (("Cancelled Order", "Customer Cancelled"), 0.15),
    (("Late Delivery", "Courier Delay"), 0.12),
    (("Other", "Unspecified"), 0.08),
];

const STATUSES: [(ExternalStatus, f64); 5] = [
    (ExternalStatus::Accepted, 0.45),
    (ExternalStatus::Denied, 0.25),
    (ExternalStatus::InProgress, 0.12),
    (ExternalStatus::ToBeRaised, 0.10),
    (ExternalStatus::Expired, 0.08),
];

struct ChainPlan {
    name: String,
    locations: u64,
}

fn plan_chains(config: &SyntheticConfig, rng: &mut SeededRng) -> Vec<ChainPlan> {
    (0..config.chain_count)
        .map(|i| {
            // Skewed toward small chains: squaring a uniform roll.
            let roll = rng.unit();
            let locations = 1 + (roll * roll * config.max_locations_per_chain as f64) as u64;
            ChainPlan {
                name: format!("Chain {:03}", i + 1),
                locations,
            }
        })
        .collect()
}

fn cents(rng: &mut SeededRng, lo: u64, hi: u64) -> Decimal {
    Decimal::new(rng.between(lo, hi) as i64, 2)
}

/// Generate disputes for every day in the configured range.
pub fn generate(config: &SyntheticConfig) -> Vec<DisputeRecord> {
    let mut chain_rng = SeededRng::for_stream(config.seed, Stream::Chains);
    let mut rng = SeededRng::for_stream(config.seed, Stream::Disputes);
    let mut id_rng = SeededRng::for_stream(config.seed, Stream::Ids);

    let chains = plan_chains(config, &mut chain_rng);
    if chains.is_empty() {
        return Vec::new();
    }
    // Busier chains have more locations and so more disputes.
    let chain_weights: Vec<(&ChainPlan, f64)> =
        chains.iter().map(|c| (c, c.locations as f64)).collect();

    let mut records = Vec::new();
    let mut day = config.date_range.start;

    while day <= config.date_range.end {
        for _ in 0..config.disputes_per_day {
            let chain = *chain_rng.weighted(&chain_weights);
            let location = rng.between(1, chain.locations);
            let platform = *rng.weighted(&PLATFORMS);
            let (category, subcategory) = *rng.weighted(&CATEGORIES);
            let status = *rng.weighted(&STATUSES);
            let raised = match status {
                ExternalStatus::ToBeRaised => false,
                ExternalStatus::Expired => rng.chance(0.2),
                _ => rng.chance(0.9),
            };

            let subtotal = cents(&mut rng, 800, 25_000);
            let refund = cents(&mut rng, 300, 6_000).min(subtotal);
            let won = match status {
                ExternalStatus::Accepted => {
                    // Partial recoveries are common.
                    let pct = Decimal::from(rng.between(50, 100));
                    (refund * pct / Decimal::from(100)).round_dp(2)
                }
                _ => Decimal::ZERO,
            };

            // Most disputes are filed within two weeks; a tail runs past
            // the longest filing window.
            let order_lag = if rng.chance(0.85) { rng.between(0, 14) } else { rng.between(15, 45) };
            let order_date = day
                .checked_sub_days(Days::new(order_lag))
                .unwrap_or(NaiveDate::MIN);

            let chain_name = if rng.chance(config.missing_chain_rate) {
                None
            } else {
                Some(chain.name.clone())
            };

            let dispute_id = uuid::Builder::from_random_bytes(id_rng.bytes16())
                .into_uuid()
                .to_string();

            records.push(DisputeRecord {
                dispute_id,
                chain: chain_name,
                b_name: format!("{} #{location:02}", chain.name),
                slug: format!(
                    "{}-{}-{location:02}",
                    platform.trim().to_ascii_lowercase(),
                    chain.name.to_ascii_lowercase().replace(' ', "-")
                ),
                platform: platform.to_string(),
                order_date,
                dispute_date: day,
                external_status: status,
                raised,
                error_category: category.to_string(),
                error_subcategory: subcategory.to_string(),
                won_amount: won,
                refund_amount: refund,
                order_subtotal: subtotal,
            });
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    log::debug!(
        "synthetic: generated {} disputes across {} chains (seed {})",
        records.len(),
        chains.len(),
        config.seed
    );
    records
}
