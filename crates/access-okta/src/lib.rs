//! Identity directory client for access-manager.
//!
//! [`DirectoryClient`] is the seam the reconciler talks to; [`OktaClient`]
//! implements it against the Okta Management API.

#![deny(missing_docs)]

mod client;
mod error;
mod okta;
mod types;

pub use client::DirectoryClient;
pub use error::{DirectoryError, DirectoryResult};
pub use okta::{OktaClient, OktaConfig, DEFAULT_TIMEOUT, MAX_PAGES};
pub use types::{ActivityStatus, GroupProfile, RemoteGroup, RemoteUser};
