//! # ingest-load
//!
//! Runs one load run against the configured ingest and upload services and
//! prints the summary as a markdown table.
//!
//! Configuration comes from the environment (see [`LoadConfig`]); the run stops
//! after `LOAD_RUN_TIME` seconds or on Ctrl-C, whichever comes first.

use ingest_load::clients::{ReqwestTransport, StaticTokenAuthenticator};
use ingest_load::lifecycle::{setup_tracing, LoadConfig, LoadRun};
use ingest_load::model::Fixtures;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = LoadConfig::from_env().map_err(|e| e.to_string())?;
    info!(
        ingest = %config.ingest_api_url,
        upload = %config.file_upload_url,
        scenario = %config.scenario,
        "Starting ingest load run"
    );

    let fixtures = Fixtures::load(&config.fixture_dir).map_err(|e| e.to_string())?;
    let authenticator = StaticTokenAuthenticator::from_config(&config).map_err(|e| e.to_string())?;
    let transport = ReqwestTransport::new(&config.ingest_api_url, config.request_timeout)
        .map_err(|e| e.to_string())?;

    let run = LoadRun::new(
        config,
        Arc::new(transport),
        Arc::new(authenticator),
        Arc::new(fixtures),
    );
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let summary = run.execute_until(interrupted).await.map_err(|e| e.to_string())?;

    println!("{summary}");
    Ok(())
}
