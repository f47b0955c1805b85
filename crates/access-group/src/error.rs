//! OktaGroup reconciliation error types

use access_okta::DirectoryError;

/// Errors that abort an OktaGroup reconciliation pass
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// Directory API failure
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Validation, serialization or Kubernetes write failure from access-common
    #[error("{0}")]
    Common(#[from] access_common::Error),

    /// Kubernetes API failure
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// More than one remote group carries the resource name
    #[error("{matches} directory groups are named '{name}'")]
    AmbiguousGroup {
        /// Group name searched for
        name: String,
        /// Number of exact matches
        matches: usize,
    },
}

impl GroupError {
    /// Whether a later retry of the same pass may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GroupError::Directory(e) => e.is_retryable(),
            GroupError::Common(e) => e.is_retryable(),
            GroupError::Kube(kube::Error::Api(ae)) => {
                !(400..500).contains(&ae.code) || ae.code == 409 || ae.code == 429
            }
            GroupError::Kube(_) => true,
            GroupError::AmbiguousGroup { .. } => false,
        }
    }
}
