//! SQLite-backed stores for features, groups and memberships.
//!
//! Every public operation takes the connection lock and runs inside a single
//! SQLite transaction. Writes use `BEGIN IMMEDIATE` and commit only when the
//! whole operation succeeded; a returned error drops the transaction, which
//! rolls it back. Reads run in a deferred transaction so multi-statement
//! queries see one snapshot.

mod entitlements;
mod features;
mod groups;
mod membership;
mod schema;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::{Result, ToggleError};
use crate::forest::FeatureForest;
use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::configure(conn)
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "feature-toggle")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("feature-toggle.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> anyhow::Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("database lock poisoned: {e}"))?;
        schema::run_migrations(&conn)
    }

    /// Run `f` in an immediate transaction, committing only on success.
    fn write<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against a single read snapshot.
    fn read<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        f(&tx)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row helpers shared by the stores
// ============================================================

const FEATURE_COLUMNS: &str = "id, name, parent_id, created_at, updated_at";

fn feature_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        groups_where_enabled: Vec::new(),
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

/// Fill in `groups_where_enabled` for every feature with one query.
fn attach_groups(conn: &Connection, features: &mut [Feature]) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT feature_id, group_id FROM feature_group_mappings ORDER BY group_id",
    )?;
    let mut by_feature: HashMap<i64, Vec<i64>> = HashMap::new();
    for pair in stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))? {
        let (feature_id, group_id) = pair?;
        by_feature.entry(feature_id).or_default().push(group_id);
    }

    for feature in features.iter_mut() {
        feature.groups_where_enabled = by_feature.remove(&feature.id).unwrap_or_default();
    }
    Ok(())
}

fn all_features(conn: &Connection) -> Result<Vec<Feature>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FEATURE_COLUMNS} FROM features ORDER BY name"
    ))?;
    let mut features = stmt
        .query_map([], feature_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    attach_groups(conn, &mut features)?;
    Ok(features)
}

fn find_feature(conn: &Connection, id: i64) -> Result<Option<Feature>> {
    let feature = conn
        .query_row(
            &format!("SELECT {FEATURE_COLUMNS} FROM features WHERE id = ?"),
            [id],
            feature_from_row,
        )
        .optional()?;

    match feature {
        Some(mut feature) => {
            feature.groups_where_enabled = enabled_groups_of(conn, id)?;
            Ok(Some(feature))
        }
        None => Ok(None),
    }
}

fn enabled_groups_of(conn: &Connection, feature_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT group_id FROM feature_group_mappings WHERE feature_id = ? ORDER BY group_id",
    )?;
    let ids = stmt
        .query_map([feature_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn feature_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM features WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn group_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM feature_groups WHERE id = ?", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Load the `(id, parent_id)` edges of every feature into an arena.
fn load_forest(conn: &Connection) -> Result<FeatureForest> {
    let mut stmt = conn.prepare("SELECT id, parent_id FROM features")?;
    let edges = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(FeatureForest::from_edges(edges))
}

/// Feature ids switched on in a group, ignoring ancestors.
fn enabled_set(conn: &Connection, group_id: i64) -> Result<HashSet<i64>> {
    let mut stmt =
        conn.prepare("SELECT feature_id FROM feature_group_mappings WHERE group_id = ?")?;
    let ids = stmt
        .query_map([group_id], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok(ids)
}

/// Look up one of the seeded protected groups by name.
fn protected_group_id(conn: &Connection, name: &str) -> Result<i64> {
    let id = conn.query_row(
        "SELECT id FROM feature_groups WHERE name = ? AND is_protected = 1",
        [name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ToggleError::Invalid(format!("{kind} name must not be empty")));
    }
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
