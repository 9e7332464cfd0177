//! Data-source seam.
//!
//! RULE: the metrics code never fetches anything itself. Whoever runs a
//! report hands it a `DisputeSource`; caching, paging and credentials all
//! live behind this trait.

use crate::{error::RecoveryResult, filter::DisputeFilter, record::DisputeRecord};

/// The contract every dispute data source must fulfil.
pub trait DisputeSource {
    /// Synchronous bulk read of every record matching `filter`.
    /// Implementations must validate the filter and return normalized
    /// records (trimmed platform and chain).
    fn fetch_dispute_records(&self, filter: &DisputeFilter) -> RecoveryResult<Vec<DisputeRecord>>;
}

impl<S: DisputeSource + ?Sized> DisputeSource for &S {
    fn fetch_dispute_records(&self, filter: &DisputeFilter) -> RecoveryResult<Vec<DisputeRecord>> {
        (**self).fetch_dispute_records(filter)
    }
}

/// A source over records already in memory. Used by tests and by callers
/// that load data some other way.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<DisputeRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<DisputeRecord>) -> Self {
        Self {
            records: records.into_iter().map(DisputeRecord::normalized).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DisputeSource for InMemorySource {
    fn fetch_dispute_records(&self, filter: &DisputeFilter) -> RecoveryResult<Vec<DisputeRecord>> {
        filter.validate()?;
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
