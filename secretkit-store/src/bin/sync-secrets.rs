//! Sync Secrets
//!
//! Pushes the local JSON secret file to a parameter or secret, writing only
//! when its content changed.

use anyhow::{Context, Result};
use secretkit_config::{SecretkitConfig, SyncKind};
use secretkit_logging::init_console_logging;
use secretkit_store::{init_deployers, open_json_secret_file, DeployOutcome, DeployRequest, Payload};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = SecretkitConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_console_logging("sync-secrets", config.log_level());

    let sync = config
        .sync
        .clone()
        .context("SECRETKIT_SYNC__TARGET is not set")?;

    let file = open_json_secret_file(&config)
        .await
        .context("Failed to open the JSON secret file")?;
    info!(path = %file.path().display(), target = %sync.target, "Configuration loaded");

    let services = init_deployers(&config).await;
    let deployer = match sync.kind {
        SyncKind::Parameter => &services.parameters,
        SyncKind::Secret => &services.secrets,
    };

    let mut request = DeployRequest::new();
    if let Some(key_id) = &sync.kms_key_id {
        request = request.kms_key_id(key_id.clone());
    }

    let outcome = deployer
        .deploy(&sync.target, &Payload::json(file.data().clone()), &request)
        .await
        .with_context(|| format!("Failed to deploy {}", sync.target))?;

    match outcome {
        DeployOutcome::Written(receipt) => {
            println!("written {} (version {})", receipt.name, receipt.version)
        }
        DeployOutcome::NoOp => println!("unchanged {}", sync.target),
    }

    Ok(())
}
