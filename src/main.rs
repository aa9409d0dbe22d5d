//! Entry point for the Commission Engine binary.
//!
//! Running this binary starts an HTTP server exposing the commission
//! API.  Configuration is read from the environment (and an optional
//! `.env` file); see [`commission_engine::config::AppConfig`] for the
//! recognised variables.

use anyhow::Result;
use commission_engine::config::AppConfig;
use commission_engine::{api, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let addr = config.server.socket_addr()?;
    api::serve(addr, &config.settings_path).await
}
