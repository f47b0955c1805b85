//! Status projection: remote group state onto `OktaGroup.status`.

use access_common::crd::{OktaGroup, OktaGroupStatus, SkippedMember};
use access_okta::{DirectoryClient, RemoteGroup};
use chrono::{DateTime, SecondsFormat, Utc};
use kube::ResourceExt;
use tracing::debug;

use crate::controller::KubeClient;
use crate::error::GroupError;

/// RFC 3339 in UTC with second precision, e.g. `2024-03-12T10:45:00Z`
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Map a remote group onto the status fields
pub fn project_status(
    group: &RemoteGroup,
    observed_generation: Option<i64>,
    skipped_members: Vec<SkippedMember>,
) -> OktaGroupStatus {
    OktaGroupStatus {
        id: Some(group.id.clone()),
        created: group.created.as_ref().map(format_time),
        last_membership_updated: group.last_membership_updated.as_ref().map(format_time),
        last_updated: group.last_updated.as_ref().map(format_time),
        observed_generation,
        skipped_members,
    }
}

/// Re-read group `group_id` and persist its projection on `record`.
///
/// The patch is skipped when the projection equals the current status, so an
/// unchanged pass does not produce a status write (and another watch event).
/// Returns the projected status.
pub async fn refresh_status(
    directory: &dyn DirectoryClient,
    kube: &dyn KubeClient,
    record: &OktaGroup,
    group_id: &str,
    skipped_members: Vec<SkippedMember>,
) -> Result<OktaGroupStatus, GroupError> {
    let group = directory.get_group(group_id).await?;
    let status = project_status(&group, record.metadata.generation, skipped_members);

    if record.status.as_ref() == Some(&status) {
        debug!("status unchanged, skipping patch");
        return Ok(status);
    }

    kube.patch_status(&record.name_any(), &status).await?;
    Ok(status)
}
