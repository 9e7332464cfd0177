//! Dispute record model: one normalized row of chargeback data.
//!
//! RULE: a physical location is the (chain, b_name) pair.
//! `slug` is a platform listing and never identifies a location.

use crate::{error::RecoveryError, types::YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Platform-side status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Accepted,
    Denied,
    InProgress,
    ToBeRaised,
    Expired,
}

impl ExternalStatus {
    pub const ALL: [ExternalStatus; 5] = [
        ExternalStatus::Accepted,
        ExternalStatus::Denied,
        ExternalStatus::InProgress,
        ExternalStatus::ToBeRaised,
        ExternalStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalStatus::Accepted   => "ACCEPTED",
            ExternalStatus::Denied     => "DENIED",
            ExternalStatus::InProgress => "IN_PROGRESS",
            ExternalStatus::ToBeRaised => "TO_BE_RAISED",
            ExternalStatus::Expired    => "EXPIRED",
        }
    }

    /// Accepted or denied: the platform has ruled.
    pub fn is_settled(&self) -> bool {
        matches!(self, ExternalStatus::Accepted | ExternalStatus::Denied)
    }

    pub fn outcome(&self) -> DisputeOutcome {
        match self {
            ExternalStatus::Accepted => DisputeOutcome::Won,
            ExternalStatus::Denied   => DisputeOutcome::Lost,
            _                        => DisputeOutcome::Pending,
        }
    }
}

impl FromStr for ExternalStatus {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ExternalStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| RecoveryError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count bucket used by scorecards: accepted = won, denied = lost,
/// everything else is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    Won,
    Lost,
    Pending,
}

/// Identity of one physical restaurant site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub chain: String,
    pub b_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub dispute_id: String,
    pub chain: Option<String>,
    pub b_name: String,
    pub slug: String,
    pub platform: String,
    pub order_date: NaiveDate,
    pub dispute_date: NaiveDate,
    pub external_status: ExternalStatus,
    /// The dispute was actually submitted to the platform.
    pub raised: bool,
    pub error_category: String,
    pub error_subcategory: String,
    pub won_amount: Decimal,
    pub refund_amount: Decimal,
    pub order_subtotal: Decimal,
}

const INACCURATE_MARKER: &str = "INACCURATE";

impl DisputeRecord {
    /// Trim free-text identity columns. Platform values arrive with stray
    /// whitespace ("Doordash " vs "Doordash") and must group together.
    pub fn normalized(mut self) -> Self {
        self.platform = self.platform.trim().to_string();
        self.b_name = self.b_name.trim().to_string();
        self.chain = self
            .chain
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    /// The chain, if present and non-blank.
    pub fn chain_name(&self) -> Option<&str> {
        self.chain
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// `None` when the chain is missing: such rows cannot be attributed
    /// to a physical location.
    pub fn location_key(&self) -> Option<LocationKey> {
        self.chain_name().map(|chain| LocationKey {
            chain: chain.to_string(),
            b_name: self.b_name.trim().to_string(),
        })
    }

    /// Fuzzy category test: any category containing "inaccurate",
    /// case-insensitively, counts as an inaccurate-order dispute.
    pub fn is_inaccurate(&self) -> bool {
        self.error_category
            .to_ascii_uppercase()
            .contains(INACCURATE_MARKER)
    }

    pub fn dispute_month(&self) -> YearMonth {
        YearMonth::of(self.dispute_date)
    }

    pub fn outcome(&self) -> DisputeOutcome {
        self.external_status.outcome()
    }
}
