use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A toggle-able capability, stored as a node in the feature forest.
///
/// Features form a forest via `parent_id`. A feature is only reachable for a
/// user when it and every one of its ancestors are enabled in the user's
/// group, so nesting a feature under another one narrows its audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Groups in which this feature is switched on (regardless of ancestors).
    #[serde(default)]
    pub groups_where_enabled: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a feature.
///
/// Updates replace both fields: a `None` parent moves the feature to the root level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureArgs {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl FeatureArgs {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
        }
    }

    pub fn child(name: impl Into<String>, parent_id: i64) -> Self {
        Self {
            name: name.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// A feature with its nested children, used for tree responses.
///
/// The `feature` fields are flattened into the JSON response, with an additional
/// `children` array containing nested `FeatureTreeNode` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTreeNode {
    #[serde(flatten)]
    pub feature: Feature,
    pub children: Vec<FeatureTreeNode>,
}

/// Answer to "is this feature enabled for the caller".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledResponse {
    pub feature_id: i64,
    pub enabled: bool,
}
