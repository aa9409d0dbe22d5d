//! Commission rule tables.
//!
//! The `settings` module defines the bracket, tier and bonus tables
//! that drive the engine, together with helpers for loading a settings
//! snapshot from JSON and checking it for structural mistakes before
//! it is used.  A single [`CommissionSettings`] value is shared,
//! read-only, by every rep computed in a run.

use crate::error::SettingsError;
use crate::rules::RangeBracket;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Revenue range mapped to a commission percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentBracket {
    pub min: Decimal,
    #[serde(default)]
    pub max: Option<Decimal>,
    /// Percentage, e.g. `7.5` for 7.5%.
    pub percent: Decimal,
}

/// Revenue range mapped to a scaling factor applied before rate lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierBracket {
    pub min: Decimal,
    #[serde(default)]
    pub max: Option<Decimal>,
    pub multiplier: Decimal,
}

/// Weekly meeting-count range mapped to a bonus amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingTier {
    pub min: Decimal,
    #[serde(default)]
    pub max: Option<Decimal>,
    pub bonus_amount: Decimal,
}

/// Extra AE commission for deals signed on a given payment term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTermBonus {
    pub term: String,
    pub bonus_percent: Decimal,
}

/// How a matched meeting tier turns into a weekly bonus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingTierPolicy {
    /// The week earns the tier's `bonus_amount` once.
    #[default]
    FlatPerTier,
    /// The week earns `bonus_amount` for every meeting held.
    PerMeetingRate,
}

/// Per-team revenue multiplier tables.  Any table may be absent, in
/// which case revenue is used unscaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueMultipliers {
    pub ae: Option<Vec<MultiplierBracket>>,
    pub sdr: Option<Vec<MultiplierBracket>>,
    pub marketing: Option<Vec<MultiplierBracket>>,
}

/// The active commission configuration.
///
/// Bracket and tier tables are disjoint half-open ranges `[min, max)`
/// sorted by ascending `min`; a `max` of `None` is unbounded.  The
/// engine takes the first matching range and does not sort tables
/// itself, so callers should run [`CommissionSettings::validate`]
/// whenever a snapshot is loaded or replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionSettings {
    pub ae_brackets: Option<Vec<PercentBracket>>,
    pub ae_payment_term_bonuses: Option<Vec<PaymentTermBonus>>,
    pub revenue_multipliers: RevenueMultipliers,
    pub sdr_meeting_tiers: Option<Vec<MeetingTier>>,
    pub sdr_meeting_tier_policy: MeetingTierPolicy,
    pub sdr_closed_won_percent: Decimal,
    /// When set, Marketing is paid exactly like an SDR.
    pub marketing_same_as_sdr: bool,
    pub marketing_inbound_percent: Decimal,
}

impl CommissionSettings {
    pub fn from_json_str(data: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Checks every table that is present for ordering, overlap and
    /// sign mistakes.  Absent tables are not an error here; the engine
    /// reports them when a branch actually needs one.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(brackets) = &self.ae_brackets {
            validate_ranges("ae_brackets", brackets)?;
        }
        if let Some(tiers) = &self.sdr_meeting_tiers {
            validate_ranges("sdr_meeting_tiers", tiers)?;
        }
        let multipliers = [
            ("revenue_multipliers.ae", &self.revenue_multipliers.ae),
            ("revenue_multipliers.sdr", &self.revenue_multipliers.sdr),
            (
                "revenue_multipliers.marketing",
                &self.revenue_multipliers.marketing,
            ),
        ];
        for (name, table) in multipliers {
            if let Some(table) = table {
                validate_ranges(name, table)?;
            }
        }
        if let Some(bonuses) = &self.ae_payment_term_bonuses {
            validate_term_bonuses(bonuses)?;
        }
        for (name, value) in [
            ("sdr_closed_won_percent", self.sdr_closed_won_percent),
            ("marketing_inbound_percent", self.marketing_inbound_percent),
        ] {
            if value < Decimal::ZERO {
                return Err(SettingsError::InvalidTable {
                    table: name,
                    index: 0,
                    reason: format!("percent {value} is negative"),
                });
            }
        }
        Ok(())
    }
}

fn validate_ranges<B: RangeBracket>(table: &'static str, entries: &[B]) -> Result<(), SettingsError> {
    let invalid = |index: usize, reason: String| SettingsError::InvalidTable {
        table,
        index,
        reason,
    };
    for (index, entry) in entries.iter().enumerate() {
        if let Some(max) = entry.max() {
            if max <= entry.min() {
                return Err(invalid(
                    index,
                    format!("max {} must be greater than min {}", max, entry.min()),
                ));
            }
        }
        if entry.value() < Decimal::ZERO {
            return Err(invalid(index, format!("value {} is negative", entry.value())));
        }
        if index == 0 {
            continue;
        }
        let prev = &entries[index - 1];
        match prev.max() {
            None => {
                return Err(invalid(
                    index,
                    "follows an unbounded range; only the last range may omit max".to_string(),
                ))
            }
            Some(prev_max) if entry.min() < prev_max => {
                return Err(invalid(
                    index,
                    format!(
                        "min {} overlaps or precedes previous range ending at {}",
                        entry.min(),
                        prev_max
                    ),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_term_bonuses(bonuses: &[PaymentTermBonus]) -> Result<(), SettingsError> {
    let mut seen = HashSet::new();
    for (index, bonus) in bonuses.iter().enumerate() {
        let term = bonus.term.trim().to_lowercase();
        if term.is_empty() {
            return Err(SettingsError::InvalidTable {
                table: "ae_payment_term_bonuses",
                index,
                reason: "term is empty".to_string(),
            });
        }
        if bonus.bonus_percent < Decimal::ZERO {
            return Err(SettingsError::InvalidTable {
                table: "ae_payment_term_bonuses",
                index,
                reason: format!("bonus percent {} is negative", bonus.bonus_percent),
            });
        }
        if !seen.insert(term) {
            return Err(SettingsError::DuplicateTerm {
                term: bonus.term.clone(),
            });
        }
    }
    Ok(())
}

/// Returns true when percentages never decrease from one bracket to the
/// next.  AE commission is only monotonic in revenue under this
/// condition.
pub fn percent_is_non_decreasing(brackets: &[PercentBracket]) -> bool {
    brackets.windows(2).all(|w| w[0].percent <= w[1].percent)
}

/// Load a settings snapshot from a JSON file and validate it.
pub fn load_settings_from_file(path: &Path) -> Result<CommissionSettings, SettingsError> {
    let data = std::fs::read_to_string(path)?;
    let settings = CommissionSettings::from_json_str(&data)?;
    settings.validate()?;
    Ok(settings)
}
