//! The directory operations the reconciler depends on.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::DirectoryResult;
use crate::types::{GroupProfile, RemoteGroup, RemoteUser};

/// Operations against the remote identity directory.
///
/// Implementations must not retry internally: every error is returned to the
/// caller, which decides whether to requeue.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Create a group with `profile`
    async fn create_group(&self, profile: &GroupProfile) -> DirectoryResult<RemoteGroup>;

    /// Overwrite the profile of group `id`
    async fn update_group(&self, id: &str, profile: &GroupProfile) -> DirectoryResult<RemoteGroup>;

    /// Fetch group `id`. Returns `NotFound` when it does not exist.
    async fn get_group(&self, id: &str) -> DirectoryResult<RemoteGroup>;

    /// Search groups by name. Matching is loose; callers filter for exact names.
    async fn list_groups(&self, name_query: &str) -> DirectoryResult<Vec<RemoteGroup>>;

    /// Delete group `id`. Deleting a missing group succeeds.
    async fn delete_group(&self, id: &str) -> DirectoryResult<()>;

    /// List the members of group `group_id`
    async fn list_group_members(&self, group_id: &str) -> DirectoryResult<Vec<RemoteUser>>;

    /// Add user `user_id` to group `group_id`
    async fn add_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()>;

    /// Remove user `user_id` from group `group_id`
    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()>;

    /// Resolve an email to exactly one user.
    ///
    /// Returns `NotFound` for zero matches and `Ambiguous` for more than one.
    async fn find_user_by_email(&self, email: &str) -> DirectoryResult<RemoteUser>;
}
