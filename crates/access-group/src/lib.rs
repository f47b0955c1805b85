//! OktaGroup reconciliation for access-manager
//!
//! Keeps one directory group per OktaGroup resource:
//! - [`upsert`]: find-or-create of the remote group and its profile
//! - [`membership`]: diff-based member sync against the desired emails
//! - [`status`]: projection of the remote group onto the resource status
//! - [`controller`]: lifecycle (finalizer, sync, deletion) and error policy

#![deny(missing_docs)]

pub mod controller;
pub mod error;
pub mod membership;
pub mod status;
pub mod upsert;

#[cfg(test)]
mod fake;

pub use controller::{
    delete_remote_group, determine_lifecycle_step, error_policy, reconcile, Context,
    ContextBuilder, KubeClient, KubeClientImpl, LifecycleStep, CONTROLLER_NAME,
};
pub use error::GroupError;
pub use membership::{sync_membership, MembershipReport};
pub use upsert::{upsert_group, UpsertOutcome, Upserted};
