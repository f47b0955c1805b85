//! Membership synchronization.
//!
//! Brings the remote membership of a group to exactly the desired emails that
//! resolve to one active directory user, with the fewest add/remove calls:
//!
//! 1. List members and project them to normalized emails (`actual`).
//! 2. For each desired email not in `actual`: resolve it and add the user if
//!    active. Unresolvable and inactive emails are skipped.
//! 3. For each email in `actual`: resolve it and remove the member if the
//!    email is no longer desired or the user is not active. Unresolvable
//!    members are left in place.
//!
//! All additions run before all removals. Lookup failures other than
//! not-found and ambiguous abort the pass, as does any failed mutation.

use std::collections::{BTreeMap, BTreeSet};

use access_common::crd::{normalize_email, SkipReason, SkippedMember};
use access_okta::{DirectoryClient, DirectoryError, RemoteUser};
use tracing::{debug, info, warn};

use crate::error::GroupError;

/// Outcome of one membership pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipReport {
    /// Emails added to the group
    pub added: Vec<String>,
    /// Emails removed from the group
    pub removed: Vec<String>,
    /// Emails the pass could not manage
    pub skipped: Vec<SkippedMember>,
}

impl MembershipReport {
    /// Whether any membership call was issued
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    fn skip(&mut self, email: &str, reason: SkipReason, message: Option<String>) {
        warn!(email, ?reason, message = message.as_deref().unwrap_or(""), "skipping member");
        self.skipped.push(SkippedMember {
            email: email.to_string(),
            reason,
            message,
        });
    }
}

/// Result of resolving an email, with per-email failures absorbed
enum Resolution {
    Found(RemoteUser),
    Unresolvable(SkipReason, String),
}

async fn resolve(directory: &dyn DirectoryClient, email: &str) -> Result<Resolution, GroupError> {
    match directory.find_user_by_email(email).await {
        Ok(user) => Ok(Resolution::Found(user)),
        Err(e @ DirectoryError::NotFound { .. }) => {
            Ok(Resolution::Unresolvable(SkipReason::NotFound, e.to_string()))
        }
        Err(e @ DirectoryError::Ambiguous { .. }) => {
            Ok(Resolution::Unresolvable(SkipReason::Ambiguous, e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Synchronize the members of `group_id` with `desired` (normalized emails).
pub async fn sync_membership(
    directory: &dyn DirectoryClient,
    group_id: &str,
    desired: &BTreeSet<String>,
) -> Result<MembershipReport, GroupError> {
    let mut report = MembershipReport::default();

    // email -> member ids; members without an email are not managed
    let mut actual: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for member in directory.list_group_members(group_id).await? {
        match member.email.as_deref().map(normalize_email) {
            Some(email) if !email.is_empty() => actual.entry(email).or_default().push(member.id),
            _ => debug!(user_id = %member.id, "ignoring member without email"),
        }
    }

    for email in desired.iter().filter(|e| !actual.contains_key(*e)) {
        match resolve(directory, email).await? {
            Resolution::Unresolvable(reason, message) => {
                report.skip(email, reason, Some(message));
            }
            Resolution::Found(user) if !user.status.is_active() => {
                report.skip(email, SkipReason::Inactive, Some(user.raw_status));
            }
            Resolution::Found(user) => {
                directory.add_group_member(group_id, &user.id).await?;
                info!(email = %email, user_id = %user.id, "added group member");
                report.added.push(email.clone());
            }
        }
    }

    for (email, member_ids) in &actual {
        let user = match resolve(directory, email).await? {
            Resolution::Unresolvable(reason, message) => {
                report.skip(email, reason, Some(message));
                continue;
            }
            Resolution::Found(user) => user,
        };

        if desired.contains(email) && user.status.is_active() {
            continue;
        }

        for member_id in member_ids {
            directory.remove_group_member(group_id, member_id).await?;
        }
        info!(
            email = %email,
            status = %user.raw_status,
            desired = desired.contains(email),
            "removed group member"
        );
        report.removed.push(email.clone());
    }

    Ok(report)
}
