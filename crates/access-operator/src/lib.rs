//! access-manager operator: wiring for the OktaGroup controller

#![deny(missing_docs)]

/// Command line and environment configuration
pub mod config;
/// Controller construction
pub mod controller_runner;
/// Startup utilities (CRD install, API readiness)
pub mod startup;
