//! Integration tests for engine configuration loading.

use recovery_core::{
    config::{EngineConfig, FilingWindow, SegmentCutoff},
    segmentation::Segment,
};
use rust_decimal_macros::dec;
use std::path::PathBuf;

/// A fresh scratch data directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("recovery-config-{name}-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("engine")).expect("create scratch dir");
    dir
}

#[test]
fn defaults_are_valid() {
    EngineConfig::default().validate().unwrap();
    EngineConfig::default_test().validate().unwrap();

    let cfg = EngineConfig::default();
    assert_eq!(cfg.segmentation.census_window_days, 30);
    assert_eq!(cfg.trend.threshold_pct, dec!(20));
    assert_eq!(cfg.reconciliation.amount_tolerance, dec!(100));
    assert_eq!(cfg.default_platforms, vec!["Doordash", "UberEats", "Grubhub"]);
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let dir = scratch_dir("partial");
    std::fs::write(
        dir.join("engine/recovery_config.json"),
        r#"{ "reconciliation": { "count_tolerance": "0", "amount_tolerance": "5" } }"#,
    )
    .unwrap();

    let cfg = EngineConfig::load(dir.to_str().unwrap()).unwrap();
    assert_eq!(cfg.reconciliation.count_tolerance, dec!(0));
    assert_eq!(cfg.reconciliation.amount_tolerance, dec!(5));
    assert_eq!(cfg.trend.long_window_months, 12);
    assert_eq!(cfg.segmentation.cutoffs.len(), 5);
}

#[test]
fn shipped_config_loads() {
    let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
    let cfg = EngineConfig::load(data_dir).unwrap();
    assert_eq!(cfg.cohort.top_n_chains, 20);
    assert_eq!(cfg.segmentation.cutoffs[3].max_rank, Some(132));

    let windows: Vec<(&str, Option<&str>, u32)> = cfg
        .timeliness
        .windows
        .iter()
        .map(|w| (w.platform.as_str(), w.chain.as_deref(), w.days))
        .collect();
    assert_eq!(
        windows,
        vec![
            ("Doordash", None, 14),
            ("Grubhub", None, 30),
            ("UberEats", None, 30),
            ("UberEats", Some("mcdonalds"), 14),
        ]
    );
}

#[test]
fn missing_file_names_the_path() {
    let err = EngineConfig::load("/definitely/not/here").unwrap_err();
    assert!(err.to_string().contains("recovery_config.json"), "{err}");
}

#[test]
fn cutoffs_must_ascend_and_end_unbounded() {
    let mut cfg = EngineConfig::default();
    cfg.segmentation.cutoffs = vec![
        SegmentCutoff { segment: Segment::P0, max_rank: Some(10) },
        SegmentCutoff { segment: Segment::P1, max_rank: Some(5) },
        SegmentCutoff { segment: Segment::P4, max_rank: None },
    ];
    assert!(cfg.validate().is_err());

    cfg.segmentation.cutoffs = vec![SegmentCutoff { segment: Segment::P0, max_rank: Some(10) }];
    assert!(cfg.validate().is_err());

    cfg.segmentation.cutoffs.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn short_window_cannot_exceed_long_window() {
    let mut cfg = EngineConfig::default();
    cfg.trend.short_window_months = 13;
    assert!(cfg.validate().is_err());
}

#[test]
fn timeliness_windows_must_name_a_platform() {
    let mut cfg = EngineConfig::default();
    cfg.timeliness.windows.push(FilingWindow {
        platform: " ".into(),
        chain: None,
        days: 10,
    });
    assert!(cfg.validate().is_err());
}
