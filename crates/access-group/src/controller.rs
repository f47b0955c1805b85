//! OktaGroup controller implementation
//!
//! Each OktaGroup moves through a small lifecycle, evaluated once per
//! trigger:
//!
//! - no deletion timestamp, no finalizer: attach the finalizer and requeue
//! - no deletion timestamp, finalizer: upsert the remote group, sync its
//!   membership and project the remote state onto the status
//! - deletion timestamp, finalizer: delete the remote group, then release
//!   the finalizer
//! - deletion timestamp, no finalizer: nothing left to do
//!
//! The finalizer is only released once the directory confirms the group is
//! gone, so a remote group is never orphaned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, Patch};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use access_common::crd::{OktaGroup, OktaGroupStatus};
use access_common::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use access_common::kube_utils::{finalizers_patch, merge_params, patch_cluster_resource_status};
use access_common::{Error, FIELD_MANAGER, OKTA_GROUP_FINALIZER};
use access_okta::{DirectoryClient, GroupProfile};

use crate::error::GroupError;
use crate::membership::{sync_membership, MembershipReport};
use crate::status::refresh_status;
use crate::upsert::{locate_group, upsert_group, UpsertOutcome};

/// Name reported on Kubernetes Events
pub const CONTROLLER_NAME: &str = "access-manager-controller";

/// Requeue delay after attaching the finalizer
pub const FINALIZER_REQUEUE: Duration = Duration::from_secs(1);

/// Requeue delay after a retryable error
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Requeue delay after an error that needs a spec or directory fix
pub const PERMANENT_ERROR_DELAY: Duration = Duration::from_secs(300);

/// Trait abstracting Kubernetes writes to OktaGroup resources
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Attach the operator finalizer to OktaGroup `name`
    async fn add_finalizer(&self, name: &str) -> Result<(), Error>;

    /// Release the operator finalizer from OktaGroup `name`
    async fn remove_finalizer(&self, name: &str) -> Result<(), Error>;

    /// Merge-patch the status of OktaGroup `name`
    async fn patch_status(&self, name: &str, status: &OktaGroupStatus) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn set_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<(), Error> {
        let api: Api<OktaGroup> = Api::all(self.client.clone());
        api.patch(
            name,
            &merge_params(FIELD_MANAGER),
            &Patch::Merge(&finalizers_patch(&finalizers)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn add_finalizer(&self, name: &str) -> Result<(), Error> {
        let api: Api<OktaGroup> = Api::all(self.client.clone());

        // A merge patch replaces the whole list, so start from the current one
        let group = api.get(name).await?;
        let mut finalizers = group.finalizers().to_vec();
        if finalizers.iter().any(|f| f == OKTA_GROUP_FINALIZER) {
            return Ok(());
        }
        finalizers.push(OKTA_GROUP_FINALIZER.to_string());

        self.set_finalizers(name, finalizers).await
    }

    async fn remove_finalizer(&self, name: &str) -> Result<(), Error> {
        let api: Api<OktaGroup> = Api::all(self.client.clone());

        let group = match api.get(name).await {
            Ok(g) => g,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(group = %name, "OktaGroup already gone");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let finalizers: Vec<String> = group
            .finalizers()
            .iter()
            .filter(|f| *f != OKTA_GROUP_FINALIZER)
            .cloned()
            .collect();

        self.set_finalizers(name, finalizers).await
    }

    async fn patch_status(&self, name: &str, status: &OktaGroupStatus) -> Result<(), Error> {
        patch_cluster_resource_status::<OktaGroup>(&self.client, name, status, FIELD_MANAGER)
            .await?;
        Ok(())
    }
}

/// Controller context shared by every reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```text
/// let ctx = Context::builder(client, directory)
///     .resync_interval(Some(Duration::from_secs(300)))
///     .build();
/// ```
pub struct Context {
    /// Kubernetes writes (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// The remote identity directory
    pub directory: Arc<dyn DirectoryClient>,
    /// Event publisher for emitting Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
    /// How long to wait before re-syncing a settled OktaGroup; `None` waits
    /// for the next change
    pub resync_interval: Option<Duration>,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client, directory: Arc<dyn DirectoryClient>) -> ContextBuilder {
        ContextBuilder::new(client, directory)
    }

    /// Create a context for testing with mock clients
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn KubeClient>, directory: Arc<dyn DirectoryClient>) -> Self {
        Self {
            kube,
            directory,
            events: Arc::new(access_common::events::NoopEventPublisher),
            resync_interval: None,
        }
    }

    /// Action returned after a successful sync
    fn settled(&self) -> Action {
        match self.resync_interval {
            Some(interval) => Action::requeue(interval),
            None => Action::await_change(),
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    directory: Arc<dyn DirectoryClient>,
    kube: Option<Arc<dyn KubeClient>>,
    events: Option<Arc<dyn EventPublisher>>,
    resync_interval: Option<Duration>,
}

impl ContextBuilder {
    fn new(client: Client, directory: Arc<dyn DirectoryClient>) -> Self {
        Self {
            client,
            directory,
            kube: None,
            events: None,
            resync_interval: None,
        }
    }

    /// Override the Kubernetes client (primarily for testing)
    pub fn kube_client(mut self, kube: Arc<dyn KubeClient>) -> Self {
        self.kube = Some(kube);
        self
    }

    /// Override the event publisher
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Periodically re-sync settled OktaGroups to pick up remote drift
    pub fn resync_interval(mut self, interval: Option<Duration>) -> Self {
        self.resync_interval = interval.filter(|d| !d.is_zero());
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let kube = self
            .kube
            .unwrap_or_else(|| Arc::new(KubeClientImpl::new(self.client.clone())));
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(KubeEventPublisher::new(self.client, CONTROLLER_NAME)));

        Context {
            kube,
            directory: self.directory,
            events,
            resync_interval: self.resync_interval,
        }
    }
}

/// What a reconciliation pass does with an OktaGroup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleStep {
    /// Attach the finalizer and requeue
    AttachFinalizer,
    /// Upsert, sync membership and project status
    Sync,
    /// Delete the remote group and release the finalizer
    Delete,
    /// Deletion is complete on our side
    Done,
}

/// Decide the lifecycle step from the deletion timestamp and finalizer
pub fn determine_lifecycle_step(group: &OktaGroup) -> LifecycleStep {
    match (group.deletion_requested(), group.has_finalizer()) {
        (false, false) => LifecycleStep::AttachFinalizer,
        (false, true) => LifecycleStep::Sync,
        (true, true) => LifecycleStep::Delete,
        (true, false) => LifecycleStep::Done,
    }
}

/// Reconcile an OktaGroup
#[instrument(skip(group, ctx), fields(group = %group.name_any()))]
pub async fn reconcile(group: Arc<OktaGroup>, ctx: Arc<Context>) -> Result<Action, GroupError> {
    let step = determine_lifecycle_step(&group);
    debug!(?step, "reconciling OktaGroup");

    match step {
        LifecycleStep::AttachFinalizer => {
            ctx.kube.add_finalizer(&group.name_any()).await?;
            info!("attached finalizer");
            publish(
                &ctx,
                &group,
                EventType::Normal,
                reasons::FINALIZER_ADDED,
                actions::RECONCILE,
                None,
            )
            .await;
            Ok(Action::requeue(FINALIZER_REQUEUE))
        }
        LifecycleStep::Sync => sync_group(&group, &ctx).await,
        LifecycleStep::Delete => delete_group(&group, &ctx).await,
        LifecycleStep::Done => Ok(Action::await_change()),
    }
}

/// Error policy for OktaGroup reconciliation
pub fn error_policy(group: Arc<OktaGroup>, error: &GroupError, _ctx: Arc<Context>) -> Action {
    let retryable = error.is_retryable();
    error!(
        ?error,
        group = %group.name_any(),
        retryable,
        "reconciliation failed"
    );

    if retryable {
        Action::requeue(RETRY_DELAY)
    } else {
        Action::requeue(PERMANENT_ERROR_DELAY)
    }
}

async fn publish(
    ctx: &Context,
    group: &OktaGroup,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    let reference: ObjectReference = group.object_ref(&());
    ctx.events
        .publish(&reference, type_, reason, action, note)
        .await;
}

/// Active path: upsert, membership sync, status projection
async fn sync_group(group: &OktaGroup, ctx: &Context) -> Result<Action, GroupError> {
    let name = group.name_any();

    if let Err(e) = group.spec.validate(&name) {
        warn!(
            error = %e,
            field = e.field().unwrap_or(""),
            "invalid OktaGroup spec, waiting for a fix"
        );
        publish(
            ctx,
            group,
            EventType::Warning,
            reasons::VALIDATION_FAILED,
            actions::RECONCILE,
            Some(e.to_string()),
        )
        .await;
        return Ok(Action::await_change());
    }

    let profile = GroupProfile::new(name.clone(), group.description());
    let upserted =
        upsert_group(ctx.directory.as_ref(), &name, group.remote_id(), &profile).await?;
    let group_id = upserted.group.id.clone();
    match upserted.outcome {
        UpsertOutcome::Created => {
            publish(
                ctx,
                group,
                EventType::Normal,
                reasons::GROUP_CREATED,
                actions::UPSERT,
                Some(format!("created directory group {group_id}")),
            )
            .await;
        }
        UpsertOutcome::Updated => {
            publish(
                ctx,
                group,
                EventType::Normal,
                reasons::GROUP_UPDATED,
                actions::UPSERT,
                Some(format!("updated profile of directory group {group_id}")),
            )
            .await;
        }
        UpsertOutcome::Unchanged => {}
    }

    let report =
        sync_membership(ctx.directory.as_ref(), &group_id, &group.desired_users()).await?;
    publish_membership_events(ctx, group, &report).await;

    let status = refresh_status(
        ctx.directory.as_ref(),
        ctx.kube.as_ref(),
        group,
        &group_id,
        report.skipped,
    )
    .await?;

    info!(
        id = %group_id,
        added = report.added.len(),
        removed = report.removed.len(),
        skipped = status.skipped_members.len(),
        "OktaGroup in sync"
    );
    Ok(ctx.settled())
}

async fn publish_membership_events(ctx: &Context, group: &OktaGroup, report: &MembershipReport) {
    if report.changed() {
        let note = format!(
            "added {} and removed {} members",
            report.added.len(),
            report.removed.len()
        );
        publish(
            ctx,
            group,
            EventType::Normal,
            reasons::MEMBERSHIP_SYNCED,
            actions::SYNC_MEMBERS,
            Some(note),
        )
        .await;
    }

    // Only announce skips when the set differs from what status already shows
    let previous = group
        .status
        .as_ref()
        .map(|s| s.skipped_members.as_slice())
        .unwrap_or_default();
    if !report.skipped.is_empty() && report.skipped.as_slice() != previous {
        let note = report
            .skipped
            .iter()
            .map(|s| format!("{} ({:?})", s.email, s.reason))
            .collect::<Vec<_>>()
            .join(", ");
        publish(
            ctx,
            group,
            EventType::Warning,
            reasons::MEMBER_SKIPPED,
            actions::SYNC_MEMBERS,
            Some(note),
        )
        .await;
    }
}

/// Delete the remote group behind `group`.
///
/// Without a recorded id the group is located by exact name; finding none
/// means there is nothing to delete. Returns the id that was deleted.
pub async fn delete_remote_group(
    directory: &dyn DirectoryClient,
    group: &OktaGroup,
) -> Result<Option<String>, GroupError> {
    let id = match group.remote_id() {
        Some(id) => Some(id.to_string()),
        None => locate_group(directory, &group.name_any(), None)
            .await?
            .map(|g| g.id),
    };

    if let Some(id) = &id {
        directory.delete_group(id).await?;
    }
    Ok(id)
}

/// Deletion path: remote group first, finalizer second
async fn delete_group(group: &OktaGroup, ctx: &Context) -> Result<Action, GroupError> {
    let name = group.name_any();

    match delete_remote_group(ctx.directory.as_ref(), group).await {
        Ok(Some(id)) => info!(id = %id, "deleted directory group"),
        Ok(None) => info!("no directory group to delete"),
        Err(e) => {
            warn!(error = %e, "directory group deletion failed, keeping finalizer");
            publish(
                ctx,
                group,
                EventType::Warning,
                reasons::DELETION_FAILED,
                actions::DELETE,
                Some(e.to_string()),
            )
            .await;
            return Err(e);
        }
    }

    ctx.kube.remove_finalizer(&name).await?;
    publish(ctx, group, EventType::Normal, reasons::GROUP_DELETED, actions::DELETE, None).await;
    Ok(Action::await_change())
}
