//! API server readiness check

use std::future::Future;
use std::time::Duration;

use kube::api::ListParams;
use kube::{Api, Client};
use tokio::time::error::Elapsed;

use access_common::crd::OktaGroup;

/// Interval between readiness probes
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for the OktaGroup API before starting anyway
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Call `probe` every `interval` until it returns `Ok`, bounded by `timeout`.
///
/// Failed probes are logged at debug level.
pub async fn poll_until_ready<T, E, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, Elapsed>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(timeout, async {
        loop {
            match probe().await {
                Ok(value) => return value,
                Err(e) => tracing::debug!(error = %e, "not ready yet"),
            }
            tokio::time::sleep(interval).await;
        }
    })
    .await
}

/// Wait until OktaGroups can be listed.
///
/// A freshly applied CRD is not served immediately. Gives up after
/// [`READY_TIMEOUT`] and leaves further retries to the controller's watcher.
pub async fn wait_for_api_ready(client: &Client) -> anyhow::Result<()> {
    let api: Api<OktaGroup> = Api::all(client.clone());

    tracing::info!("Waiting for OktaGroup API to be served...");

    let ready = poll_until_ready(READY_TIMEOUT, READY_POLL_INTERVAL, || {
        let api = api.clone();
        async move { api.list(&ListParams::default().limit(1)).await.map(|_| ()) }
    })
    .await;

    match ready {
        Ok(()) => tracing::info!("OktaGroup API ready"),
        Err(_) => tracing::warn!(
            timeout_secs = READY_TIMEOUT.as_secs(),
            "OktaGroup API not ready, proceeding anyway"
        ),
    }
    Ok(())
}
