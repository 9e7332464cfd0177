//! The single canonical win-rate definition.
//!
//! Two scopes meet here:
//!   - won      = recovered dollars from EVERY category
//!   - settled  = refunds at stake on ruled (accepted/denied) disputes,
//!                inaccurate-order category only
//!
//! `lost` is settled minus won and can go negative when recoveries come
//! from outside the inaccurate-order population. That asymmetry is part of
//! the reported metric and is kept as-is.

use crate::record::{DisputeRecord, ExternalStatus};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Running sums for one group. Additive: merging two tallies equals
/// tallying the union of their records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRateTally {
    pub won: Decimal,
    pub settled: Decimal,
    pub pending: Decimal,
    pub contested: Decimal,
}

impl WinRateTally {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a DisputeRecord>,
    {
        let mut tally = Self::default();
        for r in records {
            tally.add(r);
        }
        tally
    }

    pub fn add(&mut self, record: &DisputeRecord) {
        self.won += record.won_amount;

        if !record.is_inaccurate() {
            return;
        }

        let refund = record.refund_amount;
        let status = record.external_status;

        if status.is_settled() {
            self.settled += refund;
        }
        if is_pending(status, record.raised) {
            self.pending += refund;
        }
        if is_contested(status, record.raised) {
            self.contested += refund;
        }
    }

    pub fn lost(&self) -> Decimal {
        self.settled - self.won
    }

    /// Percentage, unrounded. Zero when nothing has settled.
    pub fn win_rate(&self) -> Decimal {
        win_rate(self.won, self.settled)
    }

    pub fn finish(&self) -> WinRateMetrics {
        WinRateMetrics {
            won: self.won,
            settled: self.settled,
            lost: self.lost(),
            pending: self.pending,
            contested: self.contested,
            win_rate: self.win_rate(),
        }
    }
}

impl AddAssign for WinRateTally {
    fn add_assign(&mut self, rhs: Self) {
        self.won += rhs.won;
        self.settled += rhs.settled;
        self.pending += rhs.pending;
        self.contested += rhs.contested;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRateMetrics {
    pub won: Decimal,
    pub settled: Decimal,
    pub lost: Decimal,
    pub pending: Decimal,
    pub contested: Decimal,
    /// Percent, full precision. Round with `present_pct` for display.
    pub win_rate: Decimal,
}

/// Compute the win-rate metrics for one pre-filtered batch.
pub fn compute<'a, I>(records: I) -> WinRateMetrics
where
    I: IntoIterator<Item = &'a DisputeRecord>,
{
    WinRateTally::from_records(records).finish()
}

/// `100 * won / settled`, or 0 when `settled` is not positive.
pub fn win_rate(won: Decimal, settled: Decimal) -> Decimal {
    if settled <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // Overflow on extreme inputs reads as zero rather than panicking.
    won.checked_mul(dec!(100))
        .and_then(|n| n.checked_div(settled))
        .unwrap_or(Decimal::ZERO)
}

/// Presentation rounding: two decimal places, half away from zero.
pub fn present_pct(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Waiting on the platform: not yet raised, or raised and in flight.
fn is_pending(status: ExternalStatus, raised: bool) -> bool {
    match status {
        ExternalStatus::ToBeRaised => true,
        ExternalStatus::InProgress => raised,
        _ => false,
    }
}

/// Total amount put in front of the platform.
fn is_contested(status: ExternalStatus, raised: bool) -> bool {
    match status {
        ExternalStatus::Accepted | ExternalStatus::ToBeRaised => true,
        ExternalStatus::InProgress | ExternalStatus::Denied => raised,
        ExternalStatus::Expired => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_requires_raise_when_in_progress() {
        assert!(is_pending(ExternalStatus::ToBeRaised, false));
        assert!(is_pending(ExternalStatus::InProgress, true));
        assert!(!is_pending(ExternalStatus::InProgress, false));
        assert!(!is_pending(ExternalStatus::Expired, true));
    }

    #[test]
    fn contested_counts_denials_only_once_raised() {
        assert!(is_contested(ExternalStatus::Accepted, false));
        assert!(is_contested(ExternalStatus::Denied, true));
        assert!(!is_contested(ExternalStatus::Denied, false));
    }

    #[test]
    fn overflowing_win_rate_is_zero_not_a_panic() {
        assert_eq!(win_rate(Decimal::MAX, dec!(1)), Decimal::ZERO);
        assert_eq!(win_rate(dec!(1), dec!(4)), dec!(25));
    }

    #[test]
    fn presentation_rounds_half_away_from_zero() {
        assert_eq!(present_pct(dec!(33.335)), dec!(33.34));
        assert_eq!(present_pct(dec!(-1.005)), dec!(-1.01));
    }
}
