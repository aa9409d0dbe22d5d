//! Error types for the commission engine.
//!
//! Only configuration problems are errors.  Per-record data problems
//! (a deal amount that is not a number, a team label matching several
//! keywords) are recovered locally and reported as diagnostics; see
//! [`crate::attribution::Diagnostics`].

use crate::models::Team;
use thiserror::Error;

/// Fatal outcome of a single rep's computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommissionError {
    /// A rule table the active branch depends on is absent or empty.
    #[error("missing rule table `{table}` required for team {team}")]
    MissingRuleTable { team: Team, table: &'static str },
    /// The team label matched none of the known keywords.
    #[error("team label {label:?} does not identify AE, SDR or Marketing")]
    UnknownTeam { label: String },
    /// A money or count figure exceeded what `Decimal` can hold.
    #[error("arithmetic overflow while computing {operation}")]
    ArithmeticOverflow { operation: &'static str },
}

/// Problems loading or validating a [`crate::settings::CommissionSettings`]
/// snapshot.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("table `{table}` entry {index}: {reason}")]
    InvalidTable {
        table: &'static str,
        index: usize,
        reason: String,
    },
    #[error("payment term {term:?} is defined more than once")]
    DuplicateTerm { term: String },
}
