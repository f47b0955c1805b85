//! access-manager operator - keeps Okta groups in sync with OktaGroup resources

use std::sync::Arc;

use clap::Parser;
use kube::CustomResourceExt;

use access_common::crd::OktaGroup;
use access_common::kube_utils::create_client;
use access_common::telemetry::init_logging;
use access_okta::OktaClient;
use access_operator::config::Cli;
use access_operator::controller_runner::build_group_controller;
use access_operator::startup::{ensure_crds_installed, wait_for_api_ready};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&OktaGroup::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_logging(cli.log_format)?;

    run_controller(cli).await
}

async fn run_controller(cli: Cli) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "access-manager controller starting...");

    let okta_config = cli.okta_config()?;
    let directory = OktaClient::new(&okta_config)
        .map_err(|e| anyhow::anyhow!("Failed to create Okta client: {}", e))?;
    tracing::info!(base_url = %directory.base_url(), "Okta client configured");

    let client = create_client(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    ensure_crds_installed(&client).await?;
    wait_for_api_ready(&client).await?;

    build_group_controller(client, Arc::new(directory), cli.resync_interval()).await;

    tracing::info!("access-manager controller stopped");
    Ok(())
}
