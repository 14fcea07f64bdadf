use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension};

use super::*;

const GROUP_COLUMNS: &str = "id, name, is_protected, created_at";

impl Database {
    // ============================================================
    // Group queries
    // ============================================================

    /// All groups ordered by id, so the seeded Default and Public groups come first.
    pub fn get_all_groups(&self) -> Result<Vec<Group>> {
        self.read(|tx| {
            let mut stmt = tx.prepare(&format!(
                "SELECT {GROUP_COLUMNS} FROM feature_groups ORDER BY id"
            ))?;
            let groups = stmt
                .query_map([], group_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            groups
                .into_iter()
                .map(|group| with_relations(tx, group))
                .collect()
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<Group>> {
        self.read(|tx| find_group(tx, id))
    }

    /// The group new users are assigned to.
    pub fn default_group(&self) -> Result<Group> {
        self.protected_group(DEFAULT_GROUP_NAME)
    }

    /// The group anonymous callers are resolved against.
    pub fn public_group(&self) -> Result<Group> {
        self.protected_group(PUBLIC_GROUP_NAME)
    }

    fn protected_group(&self, name: &str) -> Result<Group> {
        self.read(|tx| {
            let id = protected_group_id(tx, name)?;
            find_group(tx, id)?.ok_or(ToggleError::GroupNotFound(id))
        })
    }

    // ============================================================
    // Group mutations
    // ============================================================

    /// Create a group with an initial set of enabled features.
    ///
    /// Every feature id is validated up front; if any is unknown, the error lists
    /// all of them and nothing is written.
    pub fn create_group(&self, args: GroupArgs) -> Result<Group> {
        validate_name("Group", &args.name)?;

        self.write(|tx| {
            if group_name_taken(tx, &args.name, None)? {
                return Err(ToggleError::group_name_conflict(&args.name));
            }
            let features = resolve_feature_ids(tx, &args.enabled_features)?;

            tx.execute(
                "INSERT INTO feature_groups (name, is_protected, created_at) VALUES (?, 0, ?)",
                (&args.name, now()),
            )?;
            let id = tx.last_insert_rowid();
            replace_enabled_features(tx, id, &features)?;

            tracing::info!(group_id = id, name = %args.name, enabled = features.len(), "Created feature group");

            find_group(tx, id)?.ok_or(ToggleError::GroupNotFound(id))
        })
    }

    /// Rename a group and replace its enabled-feature set.
    ///
    /// Protected groups keep their name but may change their enabled features.
    pub fn update_group(&self, id: i64, args: GroupArgs) -> Result<Group> {
        validate_name("Group", &args.name)?;

        self.write(|tx| {
            let existing = find_group(tx, id)?.ok_or(ToggleError::GroupNotFound(id))?;
            if existing.is_protected && existing.name != args.name {
                return Err(ToggleError::ProtectedGroup(existing.name));
            }
            if group_name_taken(tx, &args.name, Some(id))? {
                return Err(ToggleError::group_name_conflict(&args.name));
            }
            let features = resolve_feature_ids(tx, &args.enabled_features)?;

            tx.execute(
                "UPDATE feature_groups SET name = ? WHERE id = ?",
                (&args.name, id),
            )?;
            replace_enabled_features(tx, id, &features)?;

            tracing::info!(group_id = id, name = %args.name, enabled = features.len(), "Updated feature group");

            find_group(tx, id)?.ok_or(ToggleError::GroupNotFound(id))
        })
    }

    /// Delete a group after moving all of its members to the Default group.
    pub fn delete_group(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let group = find_group(tx, id)?.ok_or(ToggleError::GroupNotFound(id))?;
            if group.is_protected {
                return Err(ToggleError::ProtectedGroup(group.name));
            }

            let default_id = protected_group_id(tx, DEFAULT_GROUP_NAME)?;
            let moved = tx.execute(
                "UPDATE users SET group_id = ? WHERE group_id = ?",
                (default_id, id),
            )?;
            tx.execute("DELETE FROM feature_group_mappings WHERE group_id = ?", [id])?;
            tx.execute("DELETE FROM feature_groups WHERE id = ?", [id])?;

            tracing::info!(group_id = id, name = %group.name, moved, "Deleted feature group");
            Ok(())
        })
    }

    /// Switch a feature on for a group.
    ///
    /// Fails with [`ToggleError::AlreadyInState`] if it is already on.
    pub fn enable_feature_for_group(&self, feature_id: i64, group_id: i64) -> Result<()> {
        self.write(|tx| {
            ensure_pair_exists(tx, feature_id, group_id)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO feature_group_mappings (feature_id, group_id) VALUES (?, ?)",
                (feature_id, group_id),
            )?;
            if inserted == 0 {
                return Err(ToggleError::AlreadyInState(format!(
                    "Feature '{feature_id}' is already enabled for group '{group_id}'"
                )));
            }

            tracing::info!(feature_id, group_id, "Enabled feature for group");
            Ok(())
        })
    }

    /// Switch a feature off for a group.
    ///
    /// Fails with [`ToggleError::AlreadyInState`] if it wasn't on.
    pub fn disable_feature_for_group(&self, feature_id: i64, group_id: i64) -> Result<()> {
        self.write(|tx| {
            ensure_pair_exists(tx, feature_id, group_id)?;

            let deleted = tx.execute(
                "DELETE FROM feature_group_mappings WHERE feature_id = ? AND group_id = ?",
                (feature_id, group_id),
            )?;
            if deleted == 0 {
                return Err(ToggleError::AlreadyInState(format!(
                    "Feature '{feature_id}' is already disabled for group '{group_id}'"
                )));
            }

            tracing::info!(feature_id, group_id, "Disabled feature for group");
            Ok(())
        })
    }
}

fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        is_protected: row.get(2)?,
        members: Vec::new(),
        enabled_features: Vec::new(),
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

pub(super) fn find_group(conn: &Connection, id: i64) -> Result<Option<Group>> {
    let group = conn
        .query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM feature_groups WHERE id = ?"),
            [id],
            group_from_row,
        )
        .optional()?;

    group.map(|group| with_relations(conn, group)).transpose()
}

/// Load the member list and enabled-feature list of a group.
fn with_relations(conn: &Connection, mut group: Group) -> Result<Group> {
    let mut members = conn.prepare("SELECT id FROM users WHERE group_id = ? ORDER BY id")?;
    group.members = members
        .query_map([group.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut features = conn.prepare(
        "SELECT feature_id FROM feature_group_mappings WHERE group_id = ? ORDER BY feature_id",
    )?;
    group.enabled_features = features
        .query_map([group.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    Ok(group)
}

fn group_name_taken(conn: &Connection, name: &str, except: Option<i64>) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM feature_groups WHERE name = ? AND id IS NOT ?",
            (name, except),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Deduplicate the requested ids and check all of them exist.
fn resolve_feature_ids(conn: &Connection, ids: &[i64]) -> Result<BTreeSet<i64>> {
    let requested: BTreeSet<i64> = ids.iter().copied().collect();
    let mut missing = Vec::new();
    for &id in &requested {
        if !feature_exists(conn, id)? {
            missing.push(id);
        }
    }

    if missing.is_empty() {
        Ok(requested)
    } else {
        Err(ToggleError::UnknownFeatures(missing))
    }
}

fn replace_enabled_features(conn: &Connection, group_id: i64, features: &BTreeSet<i64>) -> Result<()> {
    conn.execute(
        "DELETE FROM feature_group_mappings WHERE group_id = ?",
        [group_id],
    )?;
    let mut insert = conn.prepare(
        "INSERT INTO feature_group_mappings (feature_id, group_id) VALUES (?, ?)",
    )?;
    for &feature_id in features {
        insert.execute((feature_id, group_id))?;
    }
    Ok(())
}

fn ensure_pair_exists(conn: &Connection, feature_id: i64, group_id: i64) -> Result<()> {
    if !feature_exists(conn, feature_id)? {
        return Err(ToggleError::FeatureNotFound(feature_id));
    }
    if !group_exists(conn, group_id)? {
        return Err(ToggleError::GroupNotFound(group_id));
    }
    Ok(())
}
