use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::segmentation::Segment;

// ── Segmentation ───────────────────────────────────────────────────

/// Upper rank bound (inclusive) for one tier. The last tier has no bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentCutoff {
    pub segment: Segment,
    pub max_rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Length of the trailing location census, in days.
    pub census_window_days: u32,
    /// Ascending by `max_rank`; the final entry must be unbounded.
    pub cutoffs: Vec<SegmentCutoff>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            census_window_days: 30,
            cutoffs: vec![
                SegmentCutoff { segment: Segment::P0, max_rank: Some(15) },
                SegmentCutoff { segment: Segment::P1, max_rank: Some(40) },
                SegmentCutoff { segment: Segment::P2, max_rank: Some(70) },
                SegmentCutoff { segment: Segment::P3, max_rank: Some(132) },
                SegmentCutoff { segment: Segment::P4, max_rank: None },
            ],
        }
    }
}

// ── Trend detection ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub short_window_months: u32,
    pub long_window_months: u32,
    /// Minimum decline, in percent of the long average, to flag an entity.
    pub threshold_pct: Decimal,
    /// Declines strictly above this are critical; the rest are warnings.
    pub critical_pct: Decimal,
    /// Long-window settled volume must exceed this.
    pub min_settled_volume: Decimal,
    pub min_months: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short_window_months: 3,
            long_window_months: 12,
            threshold_pct: dec!(20),
            critical_pct: dec!(30),
            min_settled_volume: dec!(1000),
            min_months: 3,
        }
    }
}

// ── Reconciliation ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Allowed absolute gap for dispute counts.
    pub count_tolerance: Decimal,
    /// Allowed absolute gap for dollar amounts.
    pub amount_tolerance: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            count_tolerance: dec!(1),
            amount_tolerance: dec!(100),
        }
    }
}

// ── Cohort pivots ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    pub top_n_chains: usize,
    pub months: u32,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            top_n_chains: 20,
            months: 10,
        }
    }
}

// ── Dispute timeliness ─────────────────────────────────────────────

/// Filing window for one platform, optionally narrowed to one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingWindow {
    pub platform: String,
    #[serde(default)]
    pub chain: Option<String>,
    pub days: u32,
}

impl FilingWindow {
    fn new(platform: &str, chain: Option<&str>, days: u32) -> Self {
        Self {
            platform: platform.to_string(),
            chain: chain.map(str::to_string),
            days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinessConfig {
    /// Window for platforms with no entry below.
    pub default_window_days: u32,
    /// Chain-specific entries win over platform-wide ones.
    pub windows: Vec<FilingWindow>,
}

impl Default for TimelinessConfig {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            windows: vec![
                FilingWindow::new("Doordash", None, 14),
                FilingWindow::new("Grubhub", None, 30),
                FilingWindow::new("UberEats", None, 30),
                FilingWindow::new("UberEats", Some("mcdonalds"), 14),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub cohort: CohortConfig,
    #[serde(default)]
    pub timeliness: TimelinessConfig,
    /// Platforms reported when a request names none.
    #[serde(default = "default_platforms")]
    pub default_platforms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            trend: TrendConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            cohort: CohortConfig::default(),
            timeliness: TimelinessConfig::default(),
            default_platforms: default_platforms(),
        }
    }
}

fn default_platforms() -> Vec<String> {
    vec!["Doordash".into(), "UberEats".into(), "Grubhub".into()]
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine/recovery_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            trend: TrendConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            cohort: CohortConfig {
                top_n_chains: 5,
                months: 6,
            },
            timeliness: TimelinessConfig::default(),
            default_platforms: default_platforms(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let cutoffs = &self.segmentation.cutoffs;
        let Some(last) = cutoffs.last() else {
            anyhow::bail!("segmentation.cutoffs must not be empty");
        };
        if last.max_rank.is_some() {
            anyhow::bail!("the last segmentation cutoff must be unbounded");
        }
        let bounds: Vec<usize> = cutoffs.iter().filter_map(|c| c.max_rank).collect();
        if bounds.len() != cutoffs.len() - 1 || bounds.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("segmentation cutoffs must be strictly ascending with one unbounded tail");
        }
        if self.trend.short_window_months == 0
            || self.trend.short_window_months > self.trend.long_window_months
        {
            anyhow::bail!("trend.short_window_months must be in 1..=long_window_months");
        }
        if let Some(w) = self.timeliness.windows.iter().find(|w| w.platform.trim().is_empty()) {
            anyhow::bail!("timeliness window of {} days names no platform", w.days);
        }
        Ok(())
    }
}
