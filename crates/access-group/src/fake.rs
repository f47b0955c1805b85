//! In-memory directory used by the reconciliation tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use access_okta::{
    DirectoryClient, DirectoryError, DirectoryResult, GroupProfile, RemoteGroup, RemoteUser,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;

// The mockall-generated MockDirectoryClient only exists in access-okta's own
// test build, so a local mock is declared here.
mock! {
    pub Directory {}

    #[async_trait]
    impl DirectoryClient for Directory {
        async fn create_group(&self, profile: &GroupProfile) -> DirectoryResult<RemoteGroup>;
        async fn update_group(&self, id: &str, profile: &GroupProfile) -> DirectoryResult<RemoteGroup>;
        async fn get_group(&self, id: &str) -> DirectoryResult<RemoteGroup>;
        async fn list_groups(&self, name_query: &str) -> DirectoryResult<Vec<RemoteGroup>>;
        async fn delete_group(&self, id: &str) -> DirectoryResult<()>;
        async fn list_group_members(&self, group_id: &str) -> DirectoryResult<Vec<RemoteUser>>;
        async fn add_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()>;
        async fn remove_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()>;
        async fn find_user_by_email(&self, email: &str) -> DirectoryResult<RemoteUser>;
    }
}

/// Calls issued against a [`FakeDirectory`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub adds: usize,
    pub removes: usize,
    pub gets: usize,
    pub lists: usize,
    pub lookups: usize,
}

impl CallCounts {
    /// Calls that change remote state
    pub fn mutations(&self) -> usize {
        self.creates + self.updates + self.deletes + self.adds + self.removes
    }

    /// Every call, reads included
    pub fn total(&self) -> usize {
        self.mutations() + self.gets + self.lists + self.lookups
    }
}

#[derive(Default)]
struct State {
    groups: BTreeMap<String, RemoteGroup>,
    members: BTreeMap<String, BTreeSet<String>>,
    users: BTreeMap<String, RemoteUser>,
    calls: CallCounts,
    next_id: u64,
    clock: i64,
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::from_timestamp(1_704_067_200 + self.clock, 0).expect("valid timestamp")
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:04}", prefix, self.next_id)
    }
}

/// Directory fake with groups, users and memberships held in memory.
///
/// Group search is a case-insensitive prefix match and email lookup is
/// case-insensitive, like the real directory.
#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mutex should not be poisoned")
    }

    /// Snapshot of the calls issued so far
    pub fn calls(&self) -> CallCounts {
        self.state().calls.clone()
    }

    /// Create a group without counting the call
    pub fn seed_group(&self, name: &str, description: Option<&str>) -> String {
        let mut state = self.state();
        let id = state.id("00g");
        let now = state.tick();
        state.groups.insert(
            id.clone(),
            RemoteGroup {
                id: id.clone(),
                profile: GroupProfile::new(name, description),
                created: Some(now),
                last_updated: Some(now),
                last_membership_updated: Some(now),
            },
        );
        state.members.insert(id.clone(), BTreeSet::new());
        id
    }

    /// Create a user with the given directory status string
    pub fn seed_user(&self, email: &str, status: &str) -> String {
        let mut state = self.state();
        let id = state.id("00u");
        state
            .users
            .insert(id.clone(), RemoteUser::new(id.clone(), Some(email), status));
        id
    }

    /// Create a user whose profile has no email
    pub fn seed_user_without_email(&self, status: &str) -> String {
        let mut state = self.state();
        let id = state.id("00u");
        state
            .users
            .insert(id.clone(), RemoteUser::new(id.clone(), None, status));
        id
    }

    /// Change the status of every user with `email`
    pub fn set_status(&self, email: &str, status: &str) {
        let mut state = self.state();
        for user in state.users.values_mut() {
            if user.email.as_deref() == Some(email) {
                *user = RemoteUser::new(user.id.clone(), Some(email), status);
            }
        }
    }

    /// Put a user into a group without counting the call
    pub fn seed_member(&self, group_id: &str, user_id: &str) {
        self.state()
            .members
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    /// Emails of the current members of `group_id`, lowercased
    pub fn member_emails(&self, group_id: &str) -> BTreeSet<String> {
        let state = self.state();
        state
            .members
            .get(group_id)
            .into_iter()
            .flatten()
            .filter_map(|uid| state.users.get(uid))
            .filter_map(|u| u.email.as_deref().map(str::to_lowercase))
            .collect()
    }

    /// Current state of group `id`
    pub fn group(&self, id: &str) -> Option<RemoteGroup> {
        self.state().groups.get(id).cloned()
    }

    /// Number of groups in the directory
    pub fn group_count(&self) -> usize {
        self.state().groups.len()
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn create_group(&self, profile: &GroupProfile) -> DirectoryResult<RemoteGroup> {
        let mut state = self.state();
        state.calls.creates += 1;
        let id = state.id("00g");
        let now = state.tick();
        let group = RemoteGroup {
            id: id.clone(),
            profile: profile.clone(),
            created: Some(now),
            last_updated: Some(now),
            last_membership_updated: Some(now),
        };
        state.groups.insert(id.clone(), group.clone());
        state.members.insert(id, BTreeSet::new());
        Ok(group)
    }

    async fn update_group(&self, id: &str, profile: &GroupProfile) -> DirectoryResult<RemoteGroup> {
        let mut state = self.state();
        state.calls.updates += 1;
        let now = state.tick();
        let group = state
            .groups
            .get_mut(id)
            .ok_or_else(|| DirectoryError::not_found(format!("group {id}")))?;
        group.profile = profile.clone();
        group.last_updated = Some(now);
        Ok(group.clone())
    }

    async fn get_group(&self, id: &str) -> DirectoryResult<RemoteGroup> {
        let mut state = self.state();
        state.calls.gets += 1;
        state
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(format!("group {id}")))
    }

    async fn list_groups(&self, name_query: &str) -> DirectoryResult<Vec<RemoteGroup>> {
        let mut state = self.state();
        state.calls.lists += 1;
        let query = name_query.to_lowercase();
        Ok(state
            .groups
            .values()
            .filter(|g| g.profile.name.to_lowercase().starts_with(&query))
            .cloned()
            .collect())
    }

    async fn delete_group(&self, id: &str) -> DirectoryResult<()> {
        let mut state = self.state();
        state.calls.deletes += 1;
        state.groups.remove(id);
        state.members.remove(id);
        Ok(())
    }

    async fn list_group_members(&self, group_id: &str) -> DirectoryResult<Vec<RemoteUser>> {
        let mut state = self.state();
        state.calls.lists += 1;
        let members = state
            .members
            .get(group_id)
            .ok_or_else(|| DirectoryError::not_found(format!("group {group_id}")))?;
        Ok(members
            .iter()
            .filter_map(|uid| state.users.get(uid))
            .cloned()
            .collect())
    }

    async fn add_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()> {
        let mut state = self.state();
        state.calls.adds += 1;
        if !state.users.contains_key(user_id) {
            return Err(DirectoryError::not_found(format!("user {user_id}")));
        }
        let now = state.tick();
        state
            .members
            .get_mut(group_id)
            .ok_or_else(|| DirectoryError::not_found(format!("group {group_id}")))?
            .insert(user_id.to_string());
        if let Some(group) = state.groups.get_mut(group_id) {
            group.last_membership_updated = Some(now);
        }
        Ok(())
    }

    async fn remove_group_member(&self, group_id: &str, user_id: &str) -> DirectoryResult<()> {
        let mut state = self.state();
        state.calls.removes += 1;
        let now = state.tick();
        state
            .members
            .get_mut(group_id)
            .ok_or_else(|| DirectoryError::not_found(format!("group {group_id}")))?
            .remove(user_id);
        if let Some(group) = state.groups.get_mut(group_id) {
            group.last_membership_updated = Some(now);
        }
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> DirectoryResult<RemoteUser> {
        let mut state = self.state();
        state.calls.lookups += 1;
        let wanted = email.to_lowercase();
        let mut matches: Vec<RemoteUser> = state
            .users
            .values()
            .filter(|u| u.email.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect();
        match matches.len() {
            0 => Err(DirectoryError::not_found(format!("user {email}"))),
            1 => Ok(matches.remove(0)),
            n => Err(DirectoryError::Ambiguous {
                email: email.to_string(),
                matches: n,
            }),
        }
    }
}
