//! Bracket evaluation.
//!
//! Every rule table in the engine has the same shape: an ordered list of
//! half-open ranges `[min, max)` each carrying one value (a percent, a
//! multiplier or a bonus amount).  The [`RangeBracket`] trait lets the
//! lookup and validation code treat them uniformly.

use crate::error::CommissionError;
use crate::settings::{MeetingTier, MeetingTierPolicy, MultiplierBracket, PercentBracket};
use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A half-open numeric range mapped to a single value.
pub trait RangeBracket {
    fn min(&self) -> Decimal;
    /// Exclusive upper bound; `None` means unbounded.
    fn max(&self) -> Option<Decimal>;
    /// The rate, multiplier or amount attached to the range.
    fn value(&self) -> Decimal;

    fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min() && self.max().map_or(true, |max| amount < max)
    }
}

impl RangeBracket for PercentBracket {
    fn min(&self) -> Decimal {
        self.min
    }
    fn max(&self) -> Option<Decimal> {
        self.max
    }
    fn value(&self) -> Decimal {
        self.percent
    }
}

impl RangeBracket for MultiplierBracket {
    fn min(&self) -> Decimal {
        self.min
    }
    fn max(&self) -> Option<Decimal> {
        self.max
    }
    fn value(&self) -> Decimal {
        self.multiplier
    }
}

impl RangeBracket for MeetingTier {
    fn min(&self) -> Decimal {
        self.min
    }
    fn max(&self) -> Option<Decimal> {
        self.max
    }
    fn value(&self) -> Decimal {
        self.bonus_amount
    }
}

/// First bracket containing `amount`.  Tables must already be sorted by
/// ascending `min`.
pub fn find_bracket<B: RangeBracket>(brackets: &[B], amount: Decimal) -> Option<&B> {
    brackets.iter().find(|b| b.contains(amount))
}

/// Scales `revenue` by the first matching multiplier bracket.  Returns
/// the adjusted revenue and the multiplier used, if any bracket matched.
/// An absent table leaves revenue unchanged.
pub fn apply_multiplier(
    table: Option<&[MultiplierBracket]>,
    revenue: Decimal,
) -> Result<(Decimal, Option<Decimal>), CommissionError> {
    match table.and_then(|t| find_bracket(t, revenue)) {
        Some(bracket) => {
            let adjusted = revenue
                .checked_mul(bracket.multiplier)
                .ok_or_else(|| overflow("adjusted revenue"))?;
            Ok((adjusted, Some(bracket.multiplier)))
        }
        None => Ok((revenue, None)),
    }
}

/// `amount * percent / 100`.  The rate is divided first so that only a
/// result that is itself out of range fails.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Result<Decimal, CommissionError> {
    percent
        .checked_div(HUNDRED)
        .and_then(|rate| amount.checked_mul(rate))
        .ok_or_else(|| overflow("percentage"))
}

/// Weekly bonus for `meetings` under the given tier table and policy.
/// Zero when no tier matches.
pub fn meeting_tier_bonus(
    tiers: &[MeetingTier],
    meetings: u32,
    policy: MeetingTierPolicy,
) -> Result<Decimal, CommissionError> {
    let count = Decimal::from(meetings);
    match find_bracket(tiers, count) {
        Some(tier) => match policy {
            MeetingTierPolicy::FlatPerTier => Ok(tier.bonus_amount),
            MeetingTierPolicy::PerMeetingRate => tier
                .bonus_amount
                .checked_mul(count)
                .ok_or_else(|| overflow("meeting bonus")),
        },
        None => Ok(Decimal::ZERO),
    }
}

/// Sum `values`, failing instead of panicking when the total leaves
/// `Decimal` range.
pub fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    operation: &'static str,
) -> Result<Decimal, CommissionError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .ok_or_else(|| overflow(operation))
}

/// Round a monetary amount to cents, midpoint away from zero.  The result
/// always carries two decimal places, so `5700` serialises as `"5700.00"`.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn overflow(operation: &'static str) -> CommissionError {
    CommissionError::ArithmeticOverflow { operation }
}
