//! Commission computation engine.
//!
//! The `engine` module turns one rep's deals and meetings into a
//! [`CommissionResult`].  It performs no I/O and reads no clock: the
//! same inputs always produce the same result, so a single
//! [`CommissionEngine`] can be shared across threads and invoked for
//! many reps at once.
//!
//! The calculation runs in four stages: closed-won revenue is summed,
//! the team's revenue multiplier is applied, the team's branch computes
//! deal commission and meeting bonus, and the result is assembled with
//! both amounts rounded to cents.

use crate::error::CommissionError;
use crate::models::{
    AppliedTermBonus, CommissionBranch, CommissionResult, Deal, Meeting, Period, RepContext, Team,
    WeeklyBucket,
};
use crate::rules::{
    apply_multiplier, checked_sum, find_bracket, meeting_tier_bonus, percent_of, round_currency,
};
use crate::settings::{CommissionSettings, MultiplierBracket, PaymentTermBonus};
use crate::weeks::{bucket_meetings, MondayWeekStart, WeekBucketing};
use rust_decimal::Decimal;
use tracing::debug;

/// Computes commissions using a fixed week-bucketing policy.
pub struct CommissionEngine {
    weeks: Box<dyn WeekBucketing>,
}

impl Default for CommissionEngine {
    fn default() -> Self {
        Self::new(MondayWeekStart)
    }
}

impl CommissionEngine {
    pub fn new(weeks: impl WeekBucketing + 'static) -> Self {
        Self {
            weeks: Box::new(weeks),
        }
    }

    /// Compute the commission for one rep over one period.
    ///
    /// `deals` and `meetings` must already be attributed to the rep;
    /// deals are re-filtered only on their stage text.  Returns
    /// [`CommissionError::MissingRuleTable`] when the branch selected by
    /// the rep's team needs a table that `settings` does not define, and
    /// [`CommissionError::ArithmeticOverflow`] when an amount leaves the
    /// range `Decimal` can represent.
    pub fn compute(
        &self,
        rep: &RepContext,
        deals: &[Deal],
        meetings: &[Meeting],
        settings: &CommissionSettings,
        period: &Period,
    ) -> Result<CommissionResult, CommissionError> {
        let total_meetings = u32::try_from(meetings.len()).map_err(|_| {
            CommissionError::ArithmeticOverflow {
                operation: "meeting count",
            }
        })?;
        let closed_won: Vec<&Deal> = deals.iter().filter(|d| d.is_closed_won()).collect();
        let total_revenue = checked_sum(closed_won.iter().map(|d| d.amount), "closed-won revenue")?;

        let outcome = match rep.team {
            Team::Ae => ae_commission(&closed_won, total_revenue, settings)?,
            Team::Sdr => self.sdr_commission(
                CommissionBranch::Sdr,
                Team::Sdr,
                settings.revenue_multipliers.sdr.as_deref(),
                total_revenue,
                meetings,
                settings,
            )?,
            Team::Marketing if settings.marketing_same_as_sdr => self.sdr_commission(
                CommissionBranch::MarketingAsSdr,
                Team::Marketing,
                settings.revenue_multipliers.marketing.as_deref(),
                total_revenue,
                meetings,
                settings,
            )?,
            Team::Marketing => marketing_inbound_commission(&closed_won, settings)?,
        };

        debug!(
            rep_id = %rep.rep_id,
            branch = ?outcome.branch,
            %total_revenue,
            adjusted_revenue = %outcome.adjusted_revenue,
            "commission branch evaluated"
        );

        let deal_commission = round_currency(outcome.deal_commission);
        let meeting_bonus = round_currency(checked_sum(
            outcome.weekly_breakdown.iter().map(|w| w.bonus),
            "meeting bonus",
        )?);
        let total_commission = checked_sum([deal_commission, meeting_bonus], "total commission")?;

        Ok(CommissionResult {
            rep_id: rep.rep_id.clone(),
            rep_name: rep.rep_name.clone(),
            team: rep.team,
            period_start: period.start,
            period_end: period.end,
            branch: outcome.branch,
            total_revenue,
            adjusted_revenue: outcome.adjusted_revenue,
            applied_multiplier: outcome.applied_multiplier,
            inbound_revenue: outcome.inbound_revenue,
            deal_commission,
            meeting_bonus,
            total_commission,
            total_meetings,
            weekly_breakdown: outcome.weekly_breakdown,
            used_bracket_percent: outcome.used_bracket_percent,
            used_payment_term_bonuses: outcome.used_payment_term_bonuses,
        })
    }

    fn sdr_commission(
        &self,
        branch: CommissionBranch,
        team: Team,
        multipliers: Option<&[MultiplierBracket]>,
        total_revenue: Decimal,
        meetings: &[Meeting],
        settings: &CommissionSettings,
    ) -> Result<BranchOutcome, CommissionError> {
        let tiers = required(&settings.sdr_meeting_tiers, team, "sdr_meeting_tiers")?;
        let (adjusted_revenue, applied_multiplier) = apply_multiplier(multipliers, total_revenue)?;

        let weekly_breakdown = bucket_meetings(&*self.weeks, meetings)
            .into_iter()
            .map(|(week, count)| -> Result<WeeklyBucket, CommissionError> {
                let bonus = meeting_tier_bonus(tiers, count, settings.sdr_meeting_tier_policy)?;
                Ok(WeeklyBucket {
                    week,
                    week_label: Some(self.weeks.label(week)),
                    meetings: count,
                    bonus: round_currency(bonus),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BranchOutcome {
            branch,
            adjusted_revenue,
            applied_multiplier,
            inbound_revenue: None,
            deal_commission: percent_of(adjusted_revenue, settings.sdr_closed_won_percent)?,
            weekly_breakdown,
            used_bracket_percent: None,
            used_payment_term_bonuses: Vec::new(),
        })
    }
}

/// Compute with the default engine.  See [`CommissionEngine::compute`].
pub fn compute_commission(
    rep: &RepContext,
    deals: &[Deal],
    meetings: &[Meeting],
    settings: &CommissionSettings,
    period: &Period,
) -> Result<CommissionResult, CommissionError> {
    CommissionEngine::default().compute(rep, deals, meetings, settings, period)
}

/// What a team branch contributes before assembly.
struct BranchOutcome {
    branch: CommissionBranch,
    adjusted_revenue: Decimal,
    applied_multiplier: Option<Decimal>,
    inbound_revenue: Option<Decimal>,
    deal_commission: Decimal,
    weekly_breakdown: Vec<WeeklyBucket>,
    used_bracket_percent: Option<Decimal>,
    used_payment_term_bonuses: Vec<AppliedTermBonus>,
}

fn required<'a, T>(
    table: &'a Option<Vec<T>>,
    team: Team,
    name: &'static str,
) -> Result<&'a [T], CommissionError> {
    match table.as_deref() {
        Some(entries) if !entries.is_empty() => Ok(entries),
        _ => Err(CommissionError::MissingRuleTable { team, table: name }),
    }
}

fn ae_commission(
    closed_won: &[&Deal],
    total_revenue: Decimal,
    settings: &CommissionSettings,
) -> Result<BranchOutcome, CommissionError> {
    let brackets = required(&settings.ae_brackets, Team::Ae, "ae_brackets")?;
    let (adjusted_revenue, applied_multiplier) =
        apply_multiplier(settings.revenue_multipliers.ae.as_deref(), total_revenue)?;

    let bracket = find_bracket(brackets, adjusted_revenue);
    let mut deal_commission = match bracket {
        Some(b) => percent_of(adjusted_revenue, b.percent)?,
        None => Decimal::ZERO,
    };

    let term_bonuses = settings.ae_payment_term_bonuses.as_deref().unwrap_or(&[]);
    let mut used_payment_term_bonuses = Vec::new();
    for deal in closed_won {
        let Some(term) = deal.payment_term.as_deref().map(str::trim) else {
            continue;
        };
        if term.is_empty() {
            continue;
        }
        if let Some(bonus) = match_term(term_bonuses, term) {
            let amount = percent_of(deal.amount, bonus.bonus_percent)?;
            deal_commission = checked_sum([deal_commission, amount], "payment term bonus")?;
            used_payment_term_bonuses.push(AppliedTermBonus {
                deal_id: deal.id.clone(),
                term: bonus.term.clone(),
                amount,
            });
        }
    }

    Ok(BranchOutcome {
        branch: CommissionBranch::Ae,
        adjusted_revenue,
        applied_multiplier,
        inbound_revenue: None,
        deal_commission,
        weekly_breakdown: Vec::new(),
        used_bracket_percent: bracket.map(|b| b.percent),
        used_payment_term_bonuses,
    })
}

fn match_term<'a>(bonuses: &'a [PaymentTermBonus], term: &str) -> Option<&'a PaymentTermBonus> {
    let wanted = term.to_lowercase();
    bonuses
        .iter()
        .find(|b| b.term.trim().to_lowercase() == wanted)
}

fn marketing_inbound_commission(
    closed_won: &[&Deal],
    settings: &CommissionSettings,
) -> Result<BranchOutcome, CommissionError> {
    let inbound_revenue = checked_sum(
        closed_won.iter().filter(|d| d.is_inbound()).map(|d| d.amount),
        "inbound revenue",
    )?;
    let (adjusted_revenue, applied_multiplier) = apply_multiplier(
        settings.revenue_multipliers.marketing.as_deref(),
        inbound_revenue,
    )?;

    Ok(BranchOutcome {
        branch: CommissionBranch::MarketingInbound,
        adjusted_revenue,
        applied_multiplier,
        inbound_revenue: Some(inbound_revenue),
        deal_commission: percent_of(adjusted_revenue, settings.marketing_inbound_percent)?,
        weekly_breakdown: Vec::new(),
        used_bracket_percent: None,
        used_payment_term_bonuses: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MeetingTier, PercentBracket};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::str::FromStr;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn period() -> Period {
        Period {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        }
    }

    fn rep(team: Team) -> RepContext {
        RepContext {
            rep_id: "rep-1".into(),
            rep_name: "Test Rep".into(),
            team,
        }
    }

    fn deal(amount: &str, stage: &str) -> Deal {
        Deal {
            id: None,
            amount: d(amount),
            stage: stage.into(),
            channel: None,
            payment_term: None,
            owner: None,
        }
    }

    #[test]
    fn ae_without_brackets_is_a_configuration_error() {
        let err = compute_commission(
            &rep(Team::Ae),
            &[deal("100", "Closed Won")],
            &[],
            &CommissionSettings::default(),
            &period(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CommissionError::MissingRuleTable {
                team: Team::Ae,
                table: "ae_brackets"
            }
        );
    }

    #[test]
    fn empty_tier_table_counts_as_missing() {
        let settings = CommissionSettings {
            sdr_meeting_tiers: Some(Vec::new()),
            ..Default::default()
        };
        let err = compute_commission(&rep(Team::Sdr), &[], &[], &settings, &period()).unwrap_err();
        assert!(matches!(err, CommissionError::MissingRuleTable { team: Team::Sdr, .. }));
    }

    #[test]
    fn marketing_inbound_needs_no_tables() {
        let result = compute_commission(
            &rep(Team::Marketing),
            &[deal("100", "Closed Won")],
            &[],
            &CommissionSettings::default(),
            &period(),
        )
        .unwrap();
        assert_eq!(result.branch, CommissionBranch::MarketingInbound);
        assert_eq!(result.total_revenue, d("100"));
        assert_eq!(result.inbound_revenue, Some(Decimal::ZERO));
        assert_eq!(result.total_commission, Decimal::ZERO);
    }

    #[test]
    fn marketing_same_as_sdr_uses_meeting_tiers() {
        let settings = CommissionSettings {
            marketing_same_as_sdr: true,
            sdr_meeting_tiers: Some(vec![MeetingTier {
                min: d("1"),
                max: None,
                bonus_amount: d("25"),
            }]),
            ..Default::default()
        };
        let meetings = vec![Meeting {
            id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap(),
        }];
        let result =
            compute_commission(&rep(Team::Marketing), &[], &meetings, &settings, &period()).unwrap();
        assert_eq!(result.branch, CommissionBranch::MarketingAsSdr);
        assert_eq!(result.meeting_bonus, d("25"));
        assert_eq!(result.weekly_breakdown.len(), 1);
        assert_eq!(result.weekly_breakdown[0].week_label.as_deref(), Some("March week 1"));
    }

    #[test]
    fn ae_multiplier_scales_revenue_before_bracket_lookup() {
        let settings = CommissionSettings {
            ae_brackets: Some(vec![
                PercentBracket {
                    min: d("0"),
                    max: Some(d("10000")),
                    percent: d("5"),
                },
                PercentBracket {
                    min: d("10000"),
                    max: None,
                    percent: d("10"),
                },
            ]),
            revenue_multipliers: crate::settings::RevenueMultipliers {
                ae: Some(vec![MultiplierBracket {
                    min: d("5000"),
                    max: None,
                    multiplier: d("2"),
                }]),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = compute_commission(
            &rep(Team::Ae),
            &[deal("6000", "closedwon")],
            &[],
            &settings,
            &period(),
        )
        .unwrap();
        assert_eq!(result.total_revenue, d("6000"));
        assert_eq!(result.adjusted_revenue, d("12000"));
        assert_eq!(result.applied_multiplier, Some(d("2")));
        assert_eq!(result.used_bracket_percent, Some(d("10")));
        assert_eq!(result.deal_commission, d("1200"));
    }

    #[test]
    fn commission_is_rounded_to_cents() {
        let settings = CommissionSettings {
            ae_brackets: Some(vec![PercentBracket {
                min: d("0"),
                max: None,
                percent: d("3.333"),
            }]),
            ..Default::default()
        };
        let result = compute_commission(
            &rep(Team::Ae),
            &[deal("1000.55", "Closed Won")],
            &[],
            &settings,
            &period(),
        )
        .unwrap();
        // 1000.55 * 3.333% = 33.3483315
        assert_eq!(result.deal_commission, d("33.35"));
        assert_eq!(result.total_commission, d("33.35"));
    }

    #[test]
    fn revenue_overflow_is_reported_not_panicked() {
        let settings = CommissionSettings {
            ae_brackets: Some(vec![PercentBracket {
                min: d("0"),
                max: None,
                percent: d("10"),
            }]),
            ..Default::default()
        };
        let huge = "50000000000000000000000000000";
        let err = compute_commission(
            &rep(Team::Ae),
            &[deal(huge, "Closed Won"), deal(huge, "Closed Won")],
            &[],
            &settings,
            &period(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CommissionError::ArithmeticOverflow {
                operation: "closed-won revenue"
            }
        );
    }
}
