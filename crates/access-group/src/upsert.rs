//! Find-or-create of the remote group behind an OktaGroup.

use access_okta::{DirectoryClient, GroupProfile, RemoteGroup};
use tracing::{debug, info};

use crate::error::GroupError;

/// What the upsert had to do to the remote group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No group existed; one was created
    Created,
    /// The group existed with a different profile and was overwritten
    Updated,
    /// The group existed with the desired profile
    Unchanged,
}

/// A remote group whose profile equals the desired profile
#[derive(Clone, Debug)]
pub struct Upserted {
    /// The remote group after the upsert
    pub group: RemoteGroup,
    /// What was done to reach it
    pub outcome: UpsertOutcome,
}

/// Locate the group named exactly `name`.
///
/// The directory's name search is a prefix match, so results are filtered
/// for exact equality. More than one exact match is an error.
pub async fn find_group_by_name(
    directory: &dyn DirectoryClient,
    name: &str,
) -> Result<Option<RemoteGroup>, GroupError> {
    let mut matches: Vec<RemoteGroup> = directory
        .list_groups(name)
        .await?
        .into_iter()
        .filter(|g| g.profile.name == name)
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(GroupError::AmbiguousGroup {
            name: name.to_string(),
            matches: n,
        }),
    }
}

/// Locate the remote group, preferring the recorded id over the name.
///
/// A recorded id that no longer exists falls back to the name search; any
/// other lookup error is returned.
pub async fn locate_group(
    directory: &dyn DirectoryClient,
    name: &str,
    remote_id: Option<&str>,
) -> Result<Option<RemoteGroup>, GroupError> {
    if let Some(id) = remote_id {
        match directory.get_group(id).await {
            Ok(group) => return Ok(Some(group)),
            Err(e) if e.is_not_found() => {
                debug!(id, "recorded group id not found, searching by name");
            }
            Err(e) => return Err(e.into()),
        }
    }
    find_group_by_name(directory, name).await
}

/// Ensure a remote group named `name` exists with `profile`.
///
/// An existing group is only written when its profile differs, so repeated
/// passes over an unchanged spec issue no update calls.
pub async fn upsert_group(
    directory: &dyn DirectoryClient,
    name: &str,
    remote_id: Option<&str>,
    profile: &GroupProfile,
) -> Result<Upserted, GroupError> {
    match locate_group(directory, name, remote_id).await? {
        Some(existing) if existing.profile.same_as(profile) => Ok(Upserted {
            group: existing,
            outcome: UpsertOutcome::Unchanged,
        }),
        Some(existing) => {
            let group = directory.update_group(&existing.id, profile).await?;
            info!(id = %group.id, "updated directory group profile");
            Ok(Upserted {
                group,
                outcome: UpsertOutcome::Updated,
            })
        }
        None => {
            let group = directory.create_group(profile).await?;
            info!(id = %group.id, "created directory group");
            Ok(Upserted {
                group,
                outcome: UpsertOutcome::Created,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDirectory, MockDirectory};
    use access_okta::DirectoryError;

    #[tokio::test]
    async fn creates_when_nothing_exists() {
        let dir = FakeDirectory::new();
        let profile = GroupProfile::new("devs", Some("Developers"));

        let upserted = upsert_group(&dir, "devs", None, &profile)
            .await
            .expect("upsert");

        assert_eq!(upserted.outcome, UpsertOutcome::Created);
        assert_eq!(upserted.group.profile, profile);
        assert_eq!(dir.calls().creates, 1);
    }

    #[tokio::test]
    async fn unchanged_profile_issues_no_write() {
        let dir = FakeDirectory::new();
        let id = dir.seed_group("devs", Some("Developers"));
        let profile = GroupProfile::new("devs", Some("Developers"));

        let upserted = upsert_group(&dir, "devs", Some(&id), &profile)
            .await
            .expect("upsert");

        assert_eq!(upserted.outcome, UpsertOutcome::Unchanged);
        assert_eq!(upserted.group.id, id);
        assert_eq!(dir.calls().mutations(), 0);
    }

    #[tokio::test]
    async fn changed_description_overwrites_profile() {
        let dir = FakeDirectory::new();
        let id = dir.seed_group("devs", Some("old"));
        let profile = GroupProfile::new("devs", Some("new"));

        let upserted = upsert_group(&dir, "devs", Some(&id), &profile)
            .await
            .expect("upsert");

        assert_eq!(upserted.outcome, UpsertOutcome::Updated);
        assert_eq!(upserted.group.profile.description.as_deref(), Some("new"));
        assert_eq!(dir.calls().updates, 1);
        assert_eq!(dir.calls().creates, 0);
    }

    /// Story: the group was deleted out of band. The stale id is not found,
    /// the name search finds nothing and a new group is created.
    #[tokio::test]
    async fn stale_id_falls_back_to_name_then_creates() {
        let dir = FakeDirectory::new();
        let profile = GroupProfile::new("devs", None);

        let upserted = upsert_group(&dir, "devs", Some("00gdeleted"), &profile)
            .await
            .expect("upsert");

        assert_eq!(upserted.outcome, UpsertOutcome::Created);
        assert_ne!(upserted.group.id, "00gdeleted");
    }

    /// Story: status was lost (e.g. the resource was recreated) but the
    /// group still exists. It is adopted by exact name instead of duplicated.
    #[tokio::test]
    async fn adopts_existing_group_by_exact_name() {
        let dir = FakeDirectory::new();
        dir.seed_group("devs-contractors", None);
        let id = dir.seed_group("devs", None);

        let upserted = upsert_group(&dir, "devs", None, &GroupProfile::new("devs", None))
            .await
            .expect("upsert");

        assert_eq!(upserted.group.id, id);
        assert_eq!(upserted.outcome, UpsertOutcome::Unchanged);
        assert_eq!(dir.calls().creates, 0);
    }

    #[tokio::test]
    async fn two_exact_name_matches_are_ambiguous() {
        let dir = FakeDirectory::new();
        dir.seed_group("devs", None);
        dir.seed_group("devs", None);

        let err = upsert_group(&dir, "devs", None, &GroupProfile::new("devs", None))
            .await
            .expect_err("ambiguous");

        assert!(matches!(err, GroupError::AmbiguousGroup { matches: 2, .. }));
        assert_eq!(dir.calls().mutations(), 0);
    }

    #[tokio::test]
    async fn non_not_found_get_error_is_surfaced() {
        let mut mock = MockDirectory::new();
        mock.expect_get_group().returning(|_| {
            Err(DirectoryError::Api {
                status: 401,
                code: "E0000011".to_string(),
                summary: "Invalid token provided".to_string(),
            })
        });
        mock.expect_list_groups().never();
        mock.expect_create_group().never();

        let err = upsert_group(&mock, "devs", Some("00g1"), &GroupProfile::new("devs", None))
            .await
            .expect_err("auth failure");

        assert!(matches!(
            err,
            GroupError::Directory(DirectoryError::Api { status: 401, .. })
        ));
    }
}
