//! Restaurant CRUD Contract Suite
//!
//! Verifies, against a running server, that the restaurant collection endpoint honors
//! CORS preflight and implements create, read, update and delete correctly.
//!
//! # Suites
//!
//! - `cors`: preflight headers and wildcard origin
//! - `create`: 201 on POST, created record readable
//! - `update`: PUT and PATCH change the targeted field
//! - `delete`: 204 on DELETE, then Not Found; clearing empties the collection
//!
//! # Usage
//!
//! ```bash
//! # Run every suite against http://localhost:8000/api
//! cargo run -p crud-contract
//!
//! # Pick suites and a server
//! CONTRACT_BASE_URL=http://localhost:3000/api CONTRACT_SUITES=cors,delete cargo run -p crud-contract
//!
//! # Feature-gated tests against the live server
//! cargo test -p crud-contract --features live
//! ```

pub mod scenarios;

use contract_harness::config::{ConfigError, HarnessConfig};
use contract_harness::context::Context;
use contract_harness::report::RunReport;
use contract_harness::suite::Runner;

/// Run the configured scenarios against the configured server.
pub async fn run(config: &HarnessConfig) -> Result<RunReport, ConfigError> {
    let runner = Runner::new(scenarios::all())
        .select(&config.suites)
        .map_err(ConfigError::UnknownSuite)?;

    let mut ctx = Context::from_config(config);
    Ok(runner.run(&mut ctx).await)
}
