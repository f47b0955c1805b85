//! Custom Resource Definitions for access-manager

mod okta_group;

pub use okta_group::{
    normalize_email, OktaGroup, OktaGroupSpec, OktaGroupStatus, SkipReason, SkippedMember,
    MAX_GROUP_NAME_LEN,
};
