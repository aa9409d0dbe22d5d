//! Boundary between CRM records and the engine.
//!
//! CRM exports are loosely typed: amounts arrive as numbers, numeric
//! strings, formatted strings or garbage, and a rep's team is a free
//! text label.  This module converts both into the strongly-typed
//! inputs the engine expects.  Bad values are never fatal here; they
//! are coerced and reported through [`Diagnostics`].

use crate::error::CommissionError;
use crate::models::{Deal, Team};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// A deal as exported by the CRM, before amount coercion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeal {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Value,
    pub stage: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub payment_term: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// A deal amount that could not be read as a number and was treated as
/// zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidNumericInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    /// The offending value, rendered as JSON.
    pub raw: String,
}

/// A team label that matched more than one team keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousTeamClassification {
    pub label: String,
    pub matched: Vec<Team>,
    pub chosen: Team,
}

/// Recoverable data problems found while preparing one rep's inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub invalid_amounts: Vec<InvalidNumericInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguous_team: Option<AmbiguousTeamClassification>,
}

/// The team a label resolved to, and every team it could have meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamClassification {
    pub team: Team,
    pub matched: Vec<Team>,
}

impl TeamClassification {
    pub fn is_ambiguous(&self) -> bool {
        self.matched.len() > 1
    }
}

const TEAM_KEYWORDS: [(&str, Team); 3] = [
    ("ae", Team::Ae),
    ("sdr", Team::Sdr),
    ("marketing", Team::Marketing),
];

/// Resolve a free-text team label.
///
/// The label is matched case-insensitively by keyword containment.  When
/// several keywords match, AE takes priority over SDR, and SDR over
/// Marketing.
pub fn classify_team(label: &str) -> Result<TeamClassification, CommissionError> {
    let lowered = label.to_lowercase();
    let matched: Vec<Team> = TEAM_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, team)| *team)
        .collect();
    match matched.first() {
        Some(team) => Ok(TeamClassification {
            team: *team,
            matched,
        }),
        None => Err(CommissionError::UnknownTeam {
            label: label.to_string(),
        }),
    }
}

/// Classify a team label and record an ambiguity diagnostic if needed.
pub fn resolve_team(label: &str, diagnostics: &mut Diagnostics) -> Result<Team, CommissionError> {
    let classification = classify_team(label)?;
    if classification.is_ambiguous() {
        warn!(
            label,
            chosen = %classification.team,
            "team label matches several teams"
        );
        diagnostics.ambiguous_team = Some(AmbiguousTeamClassification {
            label: label.to_string(),
            matched: classification.matched.clone(),
            chosen: classification.team,
        });
    }
    Ok(classification.team)
}

/// Read a CRM amount.  `Ok(None)` means the value is absent; `Err(())`
/// means it is present but not numeric.
fn parse_amount(value: &Value) -> Result<Option<Decimal>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => parse_decimal(&n.to_string()).map(Some).ok_or(()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            parse_decimal(&cleaned).map(Some).ok_or(())
        }
        _ => Err(()),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Convert one raw deal.  A non-numeric amount becomes zero and is
/// returned as an [`InvalidNumericInput`].
pub fn coerce_deal(raw: RawDeal) -> (Deal, Option<InvalidNumericInput>) {
    let (amount, invalid) = match parse_amount(&raw.amount) {
        Ok(amount) => (amount.unwrap_or(Decimal::ZERO), None),
        Err(()) => (
            Decimal::ZERO,
            Some(InvalidNumericInput {
                deal_id: raw.id.clone(),
                raw: raw.amount.to_string(),
            }),
        ),
    };
    let deal = Deal {
        id: raw.id,
        amount,
        stage: raw.stage,
        channel: raw.channel,
        payment_term: raw.payment_term,
        owner: raw.owner,
    };
    (deal, invalid)
}

/// Convert a batch of raw deals, collecting amount diagnostics.
pub fn coerce_deals(raws: Vec<RawDeal>, diagnostics: &mut Diagnostics) -> Vec<Deal> {
    raws.into_iter()
        .map(|raw| {
            let (deal, invalid) = coerce_deal(raw);
            if let Some(invalid) = invalid {
                warn!(
                    deal_id = invalid.deal_id.as_deref().unwrap_or("<none>"),
                    raw = %invalid.raw,
                    "non-numeric deal amount treated as zero"
                );
                diagnostics.invalid_amounts.push(invalid);
            }
            deal
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(amount: Value) -> RawDeal {
        RawDeal {
            id: Some("deal-1".into()),
            amount,
            stage: "Closed Won".into(),
            channel: None,
            payment_term: None,
            owner: None,
        }
    }

    fn amount_of(value: Value) -> (Decimal, bool) {
        let (deal, invalid) = coerce_deal(raw(value));
        (deal.amount, invalid.is_some())
    }

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(amount_of(json!(60000)), (Decimal::from(60000), false));
        assert_eq!(amount_of(json!(1234.5)), (Decimal::from_str("1234.5").unwrap(), false));
        assert_eq!(amount_of(json!("2500.75")), (Decimal::from_str("2500.75").unwrap(), false));
        assert_eq!(amount_of(json!(" $12,000 ")), (Decimal::from(12000), false));
        assert_eq!(amount_of(json!("1e3")), (Decimal::from(1000), false));
    }

    #[test]
    fn absent_amounts_are_zero_without_diagnostic() {
        assert_eq!(amount_of(Value::Null), (Decimal::ZERO, false));
        assert_eq!(amount_of(json!("")), (Decimal::ZERO, false));
        assert_eq!(amount_of(json!("   ")), (Decimal::ZERO, false));
    }

    #[test]
    fn garbage_amounts_are_zero_with_diagnostic() {
        assert_eq!(amount_of(json!("TBD")), (Decimal::ZERO, true));
        assert_eq!(amount_of(json!(true)), (Decimal::ZERO, true));
        assert_eq!(amount_of(json!({"value": 10})), (Decimal::ZERO, true));

        let mut diagnostics = Diagnostics::default();
        let deals = coerce_deals(vec![raw(json!("n/a")), raw(json!(5))], &mut diagnostics);
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[1].amount, Decimal::from(5));
        assert_eq!(
            diagnostics.invalid_amounts,
            vec![InvalidNumericInput {
                deal_id: Some("deal-1".into()),
                raw: "\"n/a\"".into(),
            }]
        );
    }

    #[test]
    fn team_keywords_are_case_insensitive() {
        assert_eq!(classify_team("AE").unwrap().team, Team::Ae);
        assert_eq!(classify_team("Outbound SDR").unwrap().team, Team::Sdr);
        assert_eq!(classify_team("Growth Marketing").unwrap().team, Team::Marketing);
        assert!(!classify_team("sdr").unwrap().is_ambiguous());
    }

    #[test]
    fn ambiguous_team_prefers_ae_then_sdr() {
        let mut diagnostics = Diagnostics::default();
        let team = resolve_team("SDR / Marketing", &mut diagnostics).unwrap();
        assert_eq!(team, Team::Sdr);
        let ambiguity = diagnostics.ambiguous_team.unwrap();
        assert_eq!(ambiguity.matched, vec![Team::Sdr, Team::Marketing]);
        assert_eq!(ambiguity.chosen, Team::Sdr);

        assert_eq!(classify_team("ae-sdr hybrid").unwrap().team, Team::Ae);
    }

    #[test]
    fn unknown_team_is_an_error() {
        assert_eq!(
            classify_team("Customer Success"),
            Err(CommissionError::UnknownTeam {
                label: "Customer Success".into()
            })
        );
    }
}
