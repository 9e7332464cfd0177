//! Typed dispute filter handed to a data source.
//!
//! Replaces hand-built WHERE clauses: every constraint is a typed field,
//! validated once, and matched by the same code whichever source is used.

use crate::{
    error::{RecoveryError, RecoveryResult},
    record::DisputeRecord,
    types::DateRange,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which record date the range applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    #[default]
    DisputeDate,
    OrderDate,
}

impl DateField {
    pub fn column(&self) -> &'static str {
        match self {
            DateField::DisputeDate => "dispute_date",
            DateField::OrderDate   => "order_date",
        }
    }

    pub fn of(&self, record: &DisputeRecord) -> NaiveDate {
        match self {
            DateField::DisputeDate => record.dispute_date,
            DateField::OrderDate   => record.order_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeFilter {
    /// Inclusive range on `date_field`.
    pub date_range: DateRange,
    #[serde(default)]
    pub date_field: DateField,
    /// Only disputes actually submitted to the platform.
    #[serde(default)]
    pub raised_only: bool,
    /// Empty set = all platforms.
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    /// Empty set = all chains.
    #[serde(default)]
    pub chains: BTreeSet<String>,
    /// Case-insensitive substrings of `error_category`. Empty = all.
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl DisputeFilter {
    pub fn for_range(date_range: DateRange) -> Self {
        Self {
            date_range,
            date_field: DateField::DisputeDate,
            raised_only: false,
            platforms: BTreeSet::new(),
            chains: BTreeSet::new(),
            categories: BTreeSet::new(),
        }
    }

    /// Apply the range to `order_date` instead of `dispute_date`.
    pub fn on_order_date(mut self) -> Self {
        self.date_field = DateField::OrderDate;
        self
    }

    pub fn raised_only(mut self) -> Self {
        self.raised_only = true;
        self
    }

    pub fn with_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms
            .into_iter()
            .map(|p| p.into().trim().to_string())
            .collect();
        self
    }

    pub fn with_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains = chains
            .into_iter()
            .map(|c| c.into().trim().to_string())
            .collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories
            .into_iter()
            .map(|c| c.into().trim().to_ascii_uppercase())
            .collect();
        self
    }

    /// Reject inverted ranges and blank set members before any query runs.
    pub fn validate(&self) -> RecoveryResult<()> {
        if !self.date_range.is_valid() {
            return Err(RecoveryError::InvalidFilter {
                reason: format!(
                    "date range start {} is after end {}",
                    self.date_range.start, self.date_range.end
                ),
            });
        }
        for (name, set) in [
            ("platforms", &self.platforms),
            ("chains", &self.chains),
            ("categories", &self.categories),
        ] {
            if set.iter().any(|v| v.trim().is_empty()) {
                return Err(RecoveryError::InvalidFilter {
                    reason: format!("blank entry in {name}"),
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &DisputeRecord) -> bool {
        if !self.date_range.contains(self.date_field.of(record)) {
            return false;
        }
        if self.raised_only && !record.raised {
            return false;
        }
        if !self.platforms.is_empty() && !self.platforms.contains(record.platform.trim()) {
            return false;
        }
        if !self.chains.is_empty() {
            match record.chain_name() {
                Some(chain) if self.chains.contains(chain) => {}
                _ => return false,
            }
        }
        if !self.categories.is_empty() {
            let category = record.error_category.to_ascii_uppercase();
            if !self
                .categories
                .iter()
                .any(|c| category.contains(c.to_ascii_uppercase().as_str()))
            {
                return false;
            }
        }
        true
    }
}
