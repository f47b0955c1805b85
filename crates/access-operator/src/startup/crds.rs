//! CRD installation
//!
//! The operator installs its own CRD on startup using server-side apply, so
//! the schema in the cluster always matches the running version.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use access_common::crd::OktaGroup;
use access_common::FIELD_MANAGER;

/// Name of the OktaGroup CRD object
pub const OKTA_GROUP_CRD_NAME: &str = "oktagroups.access-manager.github.com";

/// Ensure the OktaGroup CRD is installed and current
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!(crd = OKTA_GROUP_CRD_NAME, "Installing CRD...");
    crds.patch(
        OKTA_GROUP_CRD_NAME,
        &params,
        &Patch::Apply(&OktaGroup::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", OKTA_GROUP_CRD_NAME, e))?;

    tracing::info!("OktaGroup CRD installed/updated");
    Ok(())
}
