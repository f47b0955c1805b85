//! Kubernetes Event recording for the OktaGroup controller.
//!
//! Events make sync outcomes visible via `kubectl describe oktagroup`. They
//! are fire-and-forget: a failed publish is logged as a warning and never
//! fails reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Publishes Kubernetes Events about a resource.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event on `resource_ref`.
    ///
    /// * `type_` - Normal or Warning
    /// * `reason` - machine-readable reason, one of [`reasons`]
    /// * `action` - what the controller did, one of [`actions`]
    /// * `note` - optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publisher backed by `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: note.map(truncate_note),
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                group = resource_ref.name.as_deref().unwrap_or_default(),
                reason,
                error = %e,
                "failed to publish OktaGroup event"
            );
        }
    }
}

/// The API server rejects Event notes longer than this many bytes
pub const MAX_NOTE_BYTES: usize = 1024;

/// Cut `note` to [`MAX_NOTE_BYTES`] on a char boundary, marking the cut.
///
/// Skipped-member notes list every email and grow with the spec.
pub fn truncate_note(note: String) -> String {
    const MARKER: &str = "...";
    if note.len() <= MAX_NOTE_BYTES {
        return note;
    }
    let mut end = MAX_NOTE_BYTES - MARKER.len();
    while !note.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &note[..end], MARKER)
}

/// Publisher that drops every event. Used in tests and dry runs.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Event reasons (REASON column of `kubectl get events`).
pub mod reasons {
    /// Finalizer attached to a new OktaGroup
    pub const FINALIZER_ADDED: &str = "FinalizerAdded";
    /// Remote group created
    pub const GROUP_CREATED: &str = "GroupCreated";
    /// Remote group profile overwritten
    pub const GROUP_UPDATED: &str = "GroupUpdated";
    /// Membership changed during a sync
    pub const MEMBERSHIP_SYNCED: &str = "MembershipSynced";
    /// A member email could not be managed
    pub const MEMBER_SKIPPED: &str = "MemberSkipped";
    /// Remote group deleted and finalizer released
    pub const GROUP_DELETED: &str = "GroupDeleted";
    /// Remote group deletion failed; finalizer kept
    pub const DELETION_FAILED: &str = "DeletionFailed";
    /// Spec validation failed
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
}

/// Event actions (ACTION column of `kubectl get events`).
pub mod actions {
    /// Standard reconciliation pass
    pub const RECONCILE: &str = "Reconcile";
    /// Creating or updating the remote group
    pub const UPSERT: &str = "Upsert";
    /// Adding or removing members
    pub const SYNC_MEMBERS: &str = "SyncMembers";
    /// Deleting the remote group
    pub const DELETE: &str = "Delete";
}
