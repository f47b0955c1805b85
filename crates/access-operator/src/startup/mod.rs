//! Startup utilities for the access-manager operator

mod crds;
mod readiness;

pub use crds::{ensure_crds_installed, OKTA_GROUP_CRD_NAME};
pub use readiness::{poll_until_ready, wait_for_api_ready, READY_POLL_INTERVAL, READY_TIMEOUT};
