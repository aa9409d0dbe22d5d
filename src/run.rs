//! Commission runs across many reps.
//!
//! A run computes every rep of one period against one settings
//! snapshot.  Reps are independent, so the work is spread over the
//! [`rayon`] thread pool.  A configuration error for one rep is
//! recorded as a failed outcome and does not stop the others.

use crate::attribution::{coerce_deals, resolve_team, Diagnostics, RawDeal};
use crate::engine::CommissionEngine;
use crate::error::CommissionError;
use crate::models::{CommissionResult, Meeting, Period, RepContext};
use crate::rules::checked_sum;
use crate::settings::CommissionSettings;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// One rep's raw inputs for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepInput {
    pub rep_id: String,
    pub rep_name: String,
    /// Free-text team label as stored in the CRM.
    pub team: String,
    #[serde(default)]
    pub deals: Vec<RawDeal>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

/// Input to a commission run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub period: Period,
    pub reps: Vec<RepInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepStatus {
    Computed,
    Failed,
}

/// The outcome of one rep within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepOutcome {
    pub rep_id: String,
    pub status: RepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommissionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub reps: usize,
    pub computed: usize,
    pub failed: usize,
    /// Sum of `total_commission` over computed reps; `None` when the sum
    /// does not fit in a `Decimal`.
    pub total_commission: Option<Decimal>,
}

/// The aggregate result of a commission run.  Outcomes are in the same
/// order as the input reps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub period: Period,
    pub outcomes: Vec<RepOutcome>,
    pub totals: RunTotals,
}

/// Classify, coerce and compute a single rep.  Diagnostics gathered
/// before a failure are still returned.
pub fn compute_rep(
    input: RepInput,
    period: &Period,
    settings: &CommissionSettings,
    engine: &CommissionEngine,
) -> (Result<CommissionResult, CommissionError>, Diagnostics) {
    let mut diagnostics = Diagnostics::default();
    let team = match resolve_team(&input.team, &mut diagnostics) {
        Ok(team) => team,
        Err(err) => return (Err(err), diagnostics),
    };
    let deals = coerce_deals(input.deals, &mut diagnostics);
    let rep = RepContext {
        rep_id: input.rep_id,
        rep_name: input.rep_name,
        team,
    };
    let result = engine.compute(&rep, &deals, &input.meetings, settings, period);
    (result, diagnostics)
}

/// Runs commissions for every rep in `input`.
pub fn run_commissions(
    input: RunInput,
    settings: &CommissionSettings,
    engine: &CommissionEngine,
) -> RunResult {
    let period = input.period;
    info!(
        period_start = %period.start,
        period_end = %period.end,
        reps = input.reps.len(),
        "commission run started"
    );

    let outcomes: Vec<RepOutcome> = input
        .reps
        .into_par_iter()
        .map(|rep| {
            let rep_id = rep.rep_id.clone();
            let (result, diagnostics) = compute_rep(rep, &period, settings, engine);
            match result {
                Ok(result) => RepOutcome {
                    rep_id,
                    status: RepStatus::Computed,
                    result: Some(result),
                    error: None,
                    diagnostics,
                },
                Err(err) => {
                    error!(rep_id = %rep_id, error = %err, "commission computation failed");
                    RepOutcome {
                        rep_id,
                        status: RepStatus::Failed,
                        result: None,
                        error: Some(err.to_string()),
                        diagnostics,
                    }
                }
            }
        })
        .collect();

    let totals = RunTotals {
        reps: outcomes.len(),
        computed: outcomes
            .iter()
            .filter(|o| o.status == RepStatus::Computed)
            .count(),
        failed: outcomes
            .iter()
            .filter(|o| o.status == RepStatus::Failed)
            .count(),
        total_commission: checked_sum(
            outcomes
                .iter()
                .filter_map(|o| o.result.as_ref())
                .map(|r| r.total_commission),
            "run total",
        )
        .map_err(|err| error!(error = %err, "run total not representable"))
        .ok(),
    };
    info!(
        computed = totals.computed,
        failed = totals.failed,
        total_commission = ?totals.total_commission,
        "commission run finished"
    );

    RunResult {
        period,
        outcomes,
        totals,
    }
}
