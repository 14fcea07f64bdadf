use rusqlite::Connection;

use super::membership::find_user;
use super::*;

impl Database {
    /// Whether a feature is reachable for a user (or an anonymous caller).
    ///
    /// The acting group is the user's group if the user is known, otherwise the
    /// Public group. The feature is enabled iff it and all of its ancestors are
    /// enabled in that group. Forest and enabled set are read in one snapshot.
    pub fn is_effectively_enabled(&self, user_id: Option<&str>, feature_id: i64) -> Result<bool> {
        self.read(|tx| {
            let forest = load_forest(tx)?;
            let group_id = acting_group(tx, user_id)?;
            let enabled = forest.is_effective(feature_id, &enabled_set(tx, group_id)?)?;

            tracing::debug!(?user_id, group_id, feature_id, enabled, "Resolved feature");
            Ok(enabled)
        })
    }

    /// Every feature reachable for a user (or an anonymous caller).
    ///
    /// Parents come before their children in the result.
    pub fn get_effectively_enabled_features(&self, user_id: Option<&str>) -> Result<Vec<Feature>> {
        self.read(|tx| {
            let forest = load_forest(tx)?;
            let group_id = acting_group(tx, user_id)?;
            let effective = forest.effective_set(&enabled_set(tx, group_id)?);

            let mut by_id: HashMap<i64, Feature> = all_features(tx)?
                .into_iter()
                .map(|f| (f.id, f))
                .collect();

            tracing::debug!(?user_id, group_id, count = effective.len(), "Resolved enabled features");
            Ok(effective
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect())
        })
    }
}

fn acting_group(conn: &Connection, user_id: Option<&str>) -> Result<i64> {
    if let Some(user) = user_id.map(|id| find_user(conn, id)).transpose()?.flatten() {
        return Ok(user.group_id);
    }
    protected_group_id(conn, PUBLIC_GROUP_NAME)
}
