//! Directory domain types and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable profile of a directory group.
///
/// Unknown profile keys returned by the directory are dropped on decode and
/// never written back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProfile {
    /// Group name
    pub name: String,

    /// Group description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupProfile {
    /// Create a profile, treating a blank description as absent
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        }
    }

    /// Whether two profiles are equal once blank descriptions are ignored.
    ///
    /// The directory reports a missing description as `null` or `""`
    /// depending on how the group was created.
    pub fn same_as(&self, other: &GroupProfile) -> bool {
        fn desc(p: &GroupProfile) -> Option<&str> {
            p.description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
        }
        self.name == other.name && desc(self) == desc(other)
    }
}

/// A group as reported by the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGroup {
    /// Directory-assigned identifier
    pub id: String,

    /// Current profile
    pub profile: GroupProfile,

    /// When the group was created
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    /// When the profile last changed
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// When membership last changed
    #[serde(default)]
    pub last_membership_updated: Option<DateTime<Utc>>,
}

/// Whether a directory user can hold group membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityStatus {
    /// `ACTIVE`
    Active,
    /// `DEPROVISIONED` or `SUSPENDED`
    Inactive,
    /// Any other lifecycle state (staged, locked out, password expired, ...)
    Other,
}

impl ActivityStatus {
    /// Parse the directory's status string. Unknown values map to `Other`.
    pub fn from_directory(status: &str) -> Self {
        match status {
            "ACTIVE" => ActivityStatus::Active,
            "DEPROVISIONED" | "SUSPENDED" => ActivityStatus::Inactive,
            _ => ActivityStatus::Other,
        }
    }

    /// Whether the user may be a member
    pub fn is_active(&self) -> bool {
        matches!(self, ActivityStatus::Active)
    }
}

/// A user as reported by the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteUser {
    /// Directory-assigned identifier
    pub id: String,
    /// Primary email, if the profile carries one
    pub email: Option<String>,
    /// Parsed lifecycle status
    pub status: ActivityStatus,
    /// Status string exactly as the directory reported it
    pub raw_status: String,
}

impl RemoteUser {
    /// Build a user from its directory status string
    pub fn new(id: impl Into<String>, email: Option<&str>, raw_status: &str) -> Self {
        Self {
            id: id.into(),
            email: email.map(str::to_string),
            status: ActivityStatus::from_directory(raw_status),
            raw_status: raw_status.to_string(),
        }
    }
}

/// Wire shape of a directory user. Only the fields the operator reads.
#[derive(Debug, Deserialize)]
pub(crate) struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub profile: UserProfileRecord,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserProfileRecord {
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserRecord> for RemoteUser {
    fn from(record: UserRecord) -> Self {
        RemoteUser::new(
            record.id,
            record.profile.email.as_deref(),
            &record.status,
        )
    }
}

/// Request body for group create and update
#[derive(Debug, Serialize)]
pub(crate) struct GroupBody<'a> {
    pub profile: &'a GroupProfile,
}

/// Error body returned by the directory on non-success responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_summary: String,
}
