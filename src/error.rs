//! Error types for store and resolution operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToggleError>;

/// Errors raised by the feature, group, membership and resolution operations.
///
/// Everything except [`ToggleError::Storage`] is a recoverable, caller-facing
/// condition. Storage errors abort the in-flight transaction, which SQLite
/// rolls back in full.
#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("There is no feature with ID '{0}'")]
    FeatureNotFound(i64),

    #[error("There is no feature group with ID '{0}'")]
    GroupNotFound(i64),

    #[error("A {entity} with name '{name}' already exists")]
    NameConflict { entity: &'static str, name: String },

    #[error("The referenced parent feature '{0}' does not exist")]
    ParentNotFound(i64),

    #[error("The following features do not exist: {}", join_ids(.0))]
    UnknownFeatures(Vec<i64>),

    #[error("Moving feature '{feature_id}' under '{parent_id}' would create a cycle")]
    CycleDetected { feature_id: i64, parent_id: i64 },

    #[error("The group '{0}' is protected and can't be renamed or deleted")]
    ProtectedGroup(String),

    #[error("{0}")]
    AlreadyInState(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Poisoned(String),
}

/// Coarse classification used by the request layer to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unprocessable,
    CycleDetected,
    InvalidOperation,
    /// Malformed input, e.g. an empty name.
    Invalid,
    Storage,
}

impl ToggleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FeatureNotFound(_) | Self::GroupNotFound(_) => ErrorKind::NotFound,
            Self::NameConflict { .. } | Self::ProtectedGroup(_) | Self::AlreadyInState(_) => {
                ErrorKind::Conflict
            }
            Self::ParentNotFound(_) | Self::UnknownFeatures(_) => ErrorKind::Unprocessable,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Storage(_) | Self::Poisoned(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn feature_name_conflict(name: &str) -> Self {
        Self::NameConflict {
            entity: "feature",
            name: name.to_string(),
        }
    }

    pub(crate) fn group_name_conflict(name: &str) -> Self {
        Self::NameConflict {
            entity: "feature group",
            name: name.to_string(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ToggleError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned(e.to_string())
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_features_lists_every_id() {
        let err = ToggleError::UnknownFeatures(vec![4, 9]);
        assert_eq!(err.to_string(), "The following features do not exist: 4, 9");
        assert_eq!(err.kind(), ErrorKind::Unprocessable);
    }

    #[test]
    fn protected_and_duplicate_errors_are_conflicts() {
        assert_eq!(
            ToggleError::ProtectedGroup("Default".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ToggleError::feature_name_conflict("Billing").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ToggleError::AlreadyInState("already enabled".into()).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn storage_errors_are_classified_as_storage() {
        let err = ToggleError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
