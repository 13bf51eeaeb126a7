//! Error taxonomy shared by every store and by the bootstrap pipeline.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::step::Phase;

/// What a duplicate-key condition collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateTarget {
    Document,
    Principal,
    Index,
    Collection,
}

impl fmt::Display for DuplicateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DuplicateTarget::Document => "document",
            DuplicateTarget::Principal => "principal",
            DuplicateTarget::Index => "index",
            DuplicateTarget::Collection => "collection",
        };
        f.write_str(label)
    }
}

/// Failure reported by a [`crate::store::Store`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("permission denied: {message}")]
    Permission { message: String },

    #[error("duplicate {target}: {message}")]
    DuplicateKey {
        target: DuplicateTarget,
        message: String,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn duplicate(target: DuplicateTarget, message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            target,
            message: message.into(),
        }
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Duplicates of principals, indexes and collections are expected on re-run.
    /// A duplicate document key is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateKey {
                target: DuplicateTarget::Principal
                    | DuplicateTarget::Index
                    | DuplicateTarget::Collection,
                ..
            }
        )
    }

    /// Stable short code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Connection { .. } => "connection",
            StoreError::Authentication { .. } => "authentication",
            StoreError::Permission { .. } => "permission",
            StoreError::DuplicateKey { .. } => "duplicate_key",
            StoreError::InvalidDocument { .. } => "invalid_document",
            StoreError::Internal(_) => "internal",
        }
    }
}

/// Failure of the bootstrap run as a whole.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("step '{step}' failed after reaching {reached}: {source}")]
    Step {
        step: &'static str,
        reached: Phase,
        #[source]
        source: StoreError,
    },

    #[error("bootstrap did not finish within {0:?}")]
    TimedOut(Duration),
}

impl BootstrapError {
    /// Last phase completed before the failure, when known.
    pub fn reached(&self) -> Option<Phase> {
        match self {
            BootstrapError::Step { reached, .. } => Some(*reached),
            BootstrapError::TimedOut(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_non_document_duplicates_are_recoverable() {
        assert!(StoreError::duplicate(DuplicateTarget::Principal, "user exists").is_recoverable());
        assert!(StoreError::duplicate(DuplicateTarget::Index, "index exists").is_recoverable());
        assert!(
            StoreError::duplicate(DuplicateTarget::Collection, "ns exists").is_recoverable()
        );
        assert!(!StoreError::duplicate(DuplicateTarget::Document, "E11000").is_recoverable());
    }

    #[test]
    fn fatal_conditions_are_not_recoverable() {
        assert!(!StoreError::connection("refused").is_recoverable());
        assert!(!StoreError::authentication("bad password").is_recoverable());
        assert!(!StoreError::permission("not authorized").is_recoverable());
        assert!(!StoreError::Internal(anyhow::anyhow!("boom")).is_recoverable());
    }

    #[test]
    fn step_error_reports_phase_and_cause() {
        let error = BootstrapError::Step {
            step: "seed_data",
            reached: Phase::DatabasesSelected,
            source: StoreError::duplicate(DuplicateTarget::Document, "E11000 username"),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("seed_data"));
        assert!(rendered.contains("E11000"));
        assert_eq!(error.reached(), Some(Phase::DatabasesSelected));
    }
}
