//! OktaGroup CRD: declarative desired state of a directory group
//!
//! An OktaGroup names a group in the identity directory, its description and
//! the emails of the users that should be members. The operator creates the
//! group when it does not exist, keeps its profile and membership in line
//! with the spec, and deletes it when the OktaGroup is deleted.

use std::collections::BTreeSet;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, OKTA_GROUP_FINALIZER};

/// Directory limit on the length of a group name
pub const MAX_GROUP_NAME_LEN: usize = 255;

/// OktaGroup defines a directory group and its desired members.
///
/// The group name is the OktaGroup's `metadata.name`.
///
/// Example:
/// ```yaml
/// apiVersion: access-manager.github.com/v1
/// kind: OktaGroup
/// metadata:
///   name: platform-admins
/// spec:
///   description: Break-glass access to the platform clusters
///   users:
///     - alice@example.com
///     - bob@example.com
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "access-manager.github.com",
    version = "v1",
    kind = "OktaGroup",
    status = "OktaGroupStatus",
    printcolumn = r#"{"name":"ID","type":"string","jsonPath":".status.id"}"#,
    printcolumn = r#"{"name":"Members","type":"integer","jsonPath":".spec.users.length"}"#,
    printcolumn = r#"{"name":"Last Membership Update","type":"date","jsonPath":".status.lastMembershipUpdated"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OktaGroupSpec {
    /// Description of the directory group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Emails of the users that should be members of the group
    #[serde(default)]
    pub users: Vec<String>,
}

impl OktaGroupSpec {
    /// Validate the spec for the group named `name`.
    ///
    /// Member emails end up inside a directory search expression, so quotes,
    /// backslashes and whitespace are rejected up front.
    pub fn validate(&self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::validation_for_field(
                name,
                "metadata.name",
                "group name cannot be empty",
            ));
        }
        if name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(Error::validation_for_field(
                name,
                "metadata.name",
                format!("group name exceeds {} characters", MAX_GROUP_NAME_LEN),
            ));
        }

        for (i, user) in self.users.iter().enumerate() {
            let field = format!("spec.users[{}]", i);
            let email = user.trim();
            if email.is_empty() {
                return Err(Error::validation_for_field(name, field, "email cannot be empty"));
            }
            if email.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
                return Err(Error::validation_for_field(
                    name,
                    field,
                    format!("email '{}' contains whitespace, quotes or backslashes", email),
                ));
            }
        }

        Ok(())
    }
}

/// Why a member email was left out of a membership sync
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SkipReason {
    /// No directory user has this email
    NotFound,
    /// More than one directory user has this email
    Ambiguous,
    /// The user exists but is not active
    Inactive,
}

/// Per-email record of a member the last sync could not manage
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMember {
    /// Normalized member email
    pub email: String,

    /// Why the member was skipped
    pub reason: SkipReason,

    /// Detail from the directory (e.g. the user's status)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// OktaGroup status, projected from the directory after a successful sync
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OktaGroupStatus {
    /// Directory identifier of the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// When the directory created the group (RFC 3339, UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// When the group's membership last changed (RFC 3339, UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_membership_updated: Option<String>,

    /// When the group's profile last changed (RFC 3339, UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Generation of the spec that was last synced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Members the last sync skipped. Always serialized so an empty list
    /// clears the previous value under a merge patch.
    #[serde(default)]
    pub skipped_members: Vec<SkippedMember>,
}

/// Normalize an email for comparison: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl OktaGroup {
    /// Desired member emails, normalized and deduplicated
    pub fn desired_users(&self) -> BTreeSet<String> {
        self.spec
            .users
            .iter()
            .map(|u| normalize_email(u))
            .filter(|u| !u.is_empty())
            .collect()
    }

    /// Desired description, with blank descriptions treated as absent
    pub fn description(&self) -> Option<&str> {
        self.spec
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Whether deletion of this OktaGroup has been requested
    pub fn deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether the operator's finalizer is attached
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == OKTA_GROUP_FINALIZER)
    }

    /// Directory id recorded by a previous sync, if any
    pub fn remote_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
