//! Chain segmentation: ranks chains by physical location count and
//! assigns a P0–P4 tier.
//!
//! The census is always a trailing window of order dates ending on `as_of`,
//! independent of whatever date range is later aggregated. Only disputes
//! actually raised with the platform count toward a chain's footprint.
//! Records without a chain are dropped here and only here.

use crate::{
    config::SegmentationConfig,
    filter::DisputeFilter,
    record::{DisputeRecord, LocationKey},
    types::{ChainId, DateRange},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    P0,
    P1,
    P2,
    P3,
    P4,
}

impl Segment {
    pub const ALL: [Segment; 5] = [Segment::P0, Segment::P1, Segment::P2, Segment::P3, Segment::P4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::P0 => "P0",
            Segment::P1 => "P1",
            Segment::P2 => "P2",
            Segment::P3 => "P3",
            Segment::P4 => "P4",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSegment {
    pub chain: ChainId,
    pub location_count: usize,
    /// 1-based; ties get distinct successive ranks.
    pub rank: usize,
    pub segment: Segment,
}

/// Result of one segmentation pass. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentMap {
    chains: BTreeMap<ChainId, ChainSegment>,
    census: Option<DateRange>,
    dropped_records: usize,
}

impl SegmentMap {
    pub fn get(&self, chain: &str) -> Option<&ChainSegment> {
        self.chains.get(chain)
    }

    /// Tier for lookup by other components. Chains missing from the
    /// census (e.g. historical chains with no recent locations) are P4.
    pub fn segment_of(&self, chain: &str) -> Segment {
        self.chains
            .get(chain.trim())
            .map_or(Segment::P4, |c| c.segment)
    }

    pub fn location_count_of(&self, chain: &str) -> usize {
        self.chains
            .get(chain.trim())
            .map_or(0, |c| c.location_count)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Census rows discarded for lacking a chain.
    pub fn dropped_records(&self) -> usize {
        self.dropped_records
    }

    pub fn census_window(&self) -> Option<DateRange> {
        self.census
    }

    /// Segments in rank order.
    pub fn ranked(&self) -> Vec<&ChainSegment> {
        let mut rows: Vec<&ChainSegment> = self.chains.values().collect();
        rows.sort_by_key(|c| c.rank);
        rows
    }

    pub fn chains_in(&self, segment: Segment) -> Vec<&ChainSegment> {
        self.ranked()
            .into_iter()
            .filter(|c| c.segment == segment)
            .collect()
    }
}

/// Map a 1-based rank to its tier via the configured cutoffs.
pub fn segment_for_rank(rank: usize, config: &SegmentationConfig) -> Segment {
    config
        .cutoffs
        .iter()
        .find(|c| c.max_rank.map_or(true, |max| rank <= max))
        .map_or(Segment::P4, |c| c.segment)
}

/// Filter that fetches exactly the census rows for `as_of`.
pub fn census_filter(as_of: NaiveDate, config: &SegmentationConfig) -> DisputeFilter {
    DisputeFilter::for_range(DateRange::trailing_days(as_of, config.census_window_days))
        .on_order_date()
        .raised_only()
}

/// Segment chains from the trailing census window ending on `as_of`.
pub fn compute_segments(
    census: &[DisputeRecord],
    as_of: NaiveDate,
    config: &SegmentationConfig,
) -> SegmentMap {
    let filter = census_filter(as_of, config);
    let window = filter.date_range;

    let mut locations: HashMap<String, HashSet<LocationKey>> = HashMap::new();
    let mut dropped = 0usize;

    for record in census.iter().filter(|r| filter.matches(r)) {
        match record.location_key() {
            Some(key) => {
                locations.entry(key.chain.clone()).or_default().insert(key);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("segmentation: dropped {dropped} census records without a chain");
    }

    let mut counts: Vec<(String, usize)> = locations
        .into_iter()
        .map(|(chain, keys)| (chain, keys.len()))
        .collect();
    // Count descending, chain name ascending for ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let chains = counts
        .into_iter()
        .enumerate()
        .map(|(i, (chain, location_count))| {
            let rank = i + 1;
            let seg = ChainSegment {
                chain: chain.clone(),
                location_count,
                rank,
                segment: segment_for_rank(rank, config),
            };
            (chain, seg)
        })
        .collect::<BTreeMap<_, _>>();

    log::debug!(
        "segmentation: {} chains ranked over census {}..={}",
        chains.len(),
        window.start,
        window.end
    );

    SegmentMap {
        chains,
        census: Some(window),
        dropped_records: dropped,
    }
}
