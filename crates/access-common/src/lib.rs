//! Common types for access-manager: CRDs, errors, events and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for every patch issued by the operator
pub const FIELD_MANAGER: &str = "access-manager-controller";

/// Finalizer that blocks OktaGroup removal until the remote group is gone
pub const OKTA_GROUP_FINALIZER: &str = "franciscoprin.access-manager-operator.finalizer";
