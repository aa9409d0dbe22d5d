//! Commission Engine library crate.
//!
//! This crate exposes the sales-commission computation engine and the
//! surrounding run and API components as reusable modules.  External
//! applications may call [`engine::compute_commission`] directly for a
//! single rep, [`run::run_commissions`] for a whole period, or embed the
//! HTTP surface via [`api::router`].

pub mod api;
pub mod attribution;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;
pub mod run;
pub mod settings;
pub mod telemetry;
pub mod weeks;

pub use engine::{compute_commission, CommissionEngine};
pub use error::{CommissionError, SettingsError};
pub use models::{CommissionResult, Deal, Meeting, Period, RepContext, Team};
pub use settings::CommissionSettings;
