//! Data models for the Commission Engine.
//!
//! The `models` module defines the serialisable structs and enums
//! representing deals, meetings, commission periods and the result of
//! a commission calculation.  These types derive `Serialize` and
//! `Deserialize` so that they can be persisted or transmitted over a
//! network.  They form the basis of the engine's input and output
//! structures.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three rep categories the engine knows how to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Account Executives close revenue-generating deals.
    Ae,
    /// Sales Development Reps book qualifying discovery meetings.
    Sdr,
    Marketing,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Team::Ae => "AE",
            Team::Sdr => "SDR",
            Team::Marketing => "Marketing",
        };
        f.write_str(name)
    }
}

/// The rule branch that produced a [`CommissionResult`].
///
/// Marketing can be paid either like an SDR or on inbound revenue,
/// depending on [`crate::settings::CommissionSettings::marketing_same_as_sdr`],
/// so the branch is reported separately from the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBranch {
    Ae,
    Sdr,
    MarketingAsSdr,
    MarketingInbound,
}

/// One CRM opportunity relevant to a commission period.
///
/// Deals arrive already scoped to the rep and period.  The engine only
/// re-filters them on stage text; ownership is never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// CRM identifier, carried for diagnostics only.
    #[serde(default)]
    pub id: Option<String>,
    /// Deal value.  Non-negative in practice but not guaranteed.
    pub amount: Decimal,
    /// Pipeline stage label, e.g. `"Closed Won"`.
    pub stage: String,
    /// Acquisition channel, e.g. `"inbound"` or `"outbound"`.
    #[serde(default)]
    pub channel: Option<String>,
    /// Contract payment term, e.g. `"6 months"`.
    #[serde(default)]
    pub payment_term: Option<String>,
    /// Opaque owner attribution resolved upstream.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Deal {
    /// A deal counts as revenue when its stage mentions both "closed"
    /// and "won".  Substring matching tolerates pipeline label drift
    /// such as `"closedwon"` or `"Closed - Won (Q3)"`.
    pub fn is_closed_won(&self) -> bool {
        let stage = self.stage.to_lowercase();
        stage.contains("closed") && stage.contains("won")
    }

    pub fn is_inbound(&self) -> bool {
        self.channel
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case("inbound"))
            .unwrap_or(false)
    }
}

/// A qualifying meeting, already filtered upstream to completed
/// discovery meetings attributed to the rep within the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(default)]
    pub id: Option<String>,
    /// Meeting start.
    pub timestamp: DateTime<Utc>,
}

/// Inclusive start and end dates of a commission period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Identifies the rep a computation is for.  Echoed into the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepContext {
    pub rep_id: String,
    pub rep_name: String,
    pub team: Team,
}

/// Meetings and bonus attributed to one calendar week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    /// Bucket key: the first day of the week.
    pub week: NaiveDate,
    /// Human-readable label for the week, e.g. `"March week 2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_label: Option<String>,
    pub meetings: u32,
    pub bonus: Decimal,
}

/// A payment-term bonus that contributed to an AE's deal commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTermBonus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    pub term: String,
    pub amount: Decimal,
}

/// The result of a commission calculation for a single rep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionResult {
    pub rep_id: String,
    pub rep_name: String,
    pub team: Team,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Which rule branch was applied.
    pub branch: CommissionBranch,
    /// Sum of closed-won deal amounts, before any multiplier.
    pub total_revenue: Decimal,
    /// Revenue the rate was applied to, after the team multiplier.
    /// For the Marketing inbound branch this is the adjusted inbound
    /// revenue.
    pub adjusted_revenue: Decimal,
    /// Multiplier taken from the matching multiplier bracket, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_multiplier: Option<Decimal>,
    /// Closed-won inbound revenue; Marketing inbound branch only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbound_revenue: Option<Decimal>,
    pub deal_commission: Decimal,
    pub meeting_bonus: Decimal,
    /// Always `deal_commission + meeting_bonus`.
    pub total_commission: Decimal,
    pub total_meetings: u32,
    /// Per-week meeting counts and bonuses, ascending by week.
    pub weekly_breakdown: Vec<WeeklyBucket>,
    /// Percent of the AE bracket that matched, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_bracket_percent: Option<Decimal>,
    #[serde(default)]
    pub used_payment_term_bonuses: Vec<AppliedTermBonus>,
}
