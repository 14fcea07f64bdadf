use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the group new users are assigned to.
pub const DEFAULT_GROUP_NAME: &str = "Default";

/// Name of the virtual group used to resolve anonymous callers.
pub const PUBLIC_GROUP_NAME: &str = "Public";

/// A named partition of users sharing one entitlement view.
///
/// Membership and enablement are both derived views: `members` comes from the
/// users table and `enabled_features` from the feature/group join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Protected groups (Default and Public) can't be renamed or deleted.
    pub is_protected: bool,
    pub members: Vec<String>,
    pub enabled_features: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_public(&self) -> bool {
        self.name == PUBLIC_GROUP_NAME
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GROUP_NAME
    }
}

/// Input for creating or updating a group.
///
/// On update, `enabled_features` replaces the group's whole enabled set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupArgs {
    pub name: String,
    #[serde(default)]
    pub enabled_features: Vec<i64>,
}

impl GroupArgs {
    pub fn new(name: impl Into<String>, enabled_features: impl Into<Vec<i64>>) -> Self {
        Self {
            name: name.into(),
            enabled_features: enabled_features.into(),
        }
    }
}
