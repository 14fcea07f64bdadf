use serde::{Deserialize, Serialize};

/// A user, known to the service only through its group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// External identity, as issued by the authentication provider.
    pub id: String,
    pub group_id: i64,
}
