//! Restaurant CRUD contract runner.
//!
//! Exit status: 0 when every test passed, 1 when any test failed or was skipped or a
//! teardown failed, 2 on configuration errors.

use contract_harness::config::HarnessConfig;
use contract_harness::server::ServerConnection;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crud_contract=info,contract_harness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    info!(
        base_url = %config.base_url,
        suites = ?config.suites,
        "Configuration loaded successfully"
    );

    if let Err(e) = ServerConnection::connect(&config).await {
        error!("{}", e);
        return ExitCode::from(2);
    }

    let report = match crud_contract::run(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    println!("{}", report);

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
