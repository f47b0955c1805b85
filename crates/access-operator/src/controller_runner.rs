//! Controller runner - builds the OktaGroup controller future

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use access_common::crd::OktaGroup;
use access_group::{error_policy, reconcile, Context};
use access_okta::DirectoryClient;

/// Watcher timeout (seconds) - must be less than the client read timeout.
/// The API server then closes idle watches before the client gives up on them.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the OktaGroup controller future.
///
/// The future completes once a shutdown signal (SIGTERM/SIGINT) has been
/// received and in-flight reconciliations are dropped.
pub fn build_group_controller(
    client: Client,
    directory: Arc<dyn DirectoryClient>,
    resync_interval: Option<Duration>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(
        Context::builder(client.clone(), directory)
            .resync_interval(resync_interval)
            .build(),
    );
    let groups: Api<OktaGroup> = Api::all(client);

    tracing::info!(
        resync_secs = resync_interval.map(|d| d.as_secs()).unwrap_or(0),
        "- OktaGroup controller"
    );

    Box::pin(
        Controller::new(groups, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("OktaGroup")),
    )
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
