use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension};

use super::*;

impl Database {
    // ============================================================
    // Feature queries
    // ============================================================

    /// All features ordered by name.
    pub fn get_all_features(&self) -> Result<Vec<Feature>> {
        self.read(|tx| all_features(tx))
    }

    pub fn get_feature(&self, id: i64) -> Result<Option<Feature>> {
        self.read(|tx| find_feature(tx, id))
    }

    /// Direct children of a feature, ordered by name.
    pub fn get_children(&self, parent_id: i64) -> Result<Vec<Feature>> {
        self.read(|tx| {
            if !feature_exists(tx, parent_id)? {
                return Err(ToggleError::FeatureNotFound(parent_id));
            }
            let mut stmt = tx.prepare(&format!(
                "SELECT {FEATURE_COLUMNS} FROM features WHERE parent_id = ? ORDER BY name"
            ))?;
            let mut children = stmt
                .query_map([parent_id], feature_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            attach_groups(tx, &mut children)?;
            Ok(children)
        })
    }

    /// The whole forest as nested nodes, siblings ordered by name.
    pub fn get_feature_tree(&self) -> Result<Vec<FeatureTreeNode>> {
        let features = self.get_all_features()?;

        let mut children_map: HashMap<Option<i64>, Vec<Feature>> = HashMap::new();
        for feature in features {
            children_map
                .entry(feature.parent_id)
                .or_default()
                .push(feature);
        }

        fn build_subtree(
            parent_id: Option<i64>,
            children_map: &HashMap<Option<i64>, Vec<Feature>>,
        ) -> Vec<FeatureTreeNode> {
            children_map
                .get(&parent_id)
                .map(|features| {
                    features
                        .iter()
                        .map(|f| FeatureTreeNode {
                            feature: f.clone(),
                            children: build_subtree(Some(f.id), children_map),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        Ok(build_subtree(None, &children_map))
    }

    /// Features from the root down to `id`, inclusive.
    pub fn get_ancestor_chain(&self, id: i64) -> Result<Vec<Feature>> {
        self.read(|tx| {
            let chain = load_forest(tx)?.ancestor_chain(id)?;
            let mut by_id: HashMap<i64, Feature> = all_features(tx)?
                .into_iter()
                .map(|f| (f.id, f))
                .collect();
            Ok(chain.iter().filter_map(|id| by_id.remove(id)).collect())
        })
    }

    // ============================================================
    // Feature mutations
    // ============================================================

    pub fn create_feature(&self, args: FeatureArgs) -> Result<Feature> {
        validate_name("Feature", &args.name)?;

        self.write(|tx| {
            if feature_name_taken(tx, &args.name, None)? {
                return Err(ToggleError::feature_name_conflict(&args.name));
            }
            if let Some(parent_id) = args.parent_id {
                if !feature_exists(tx, parent_id)? {
                    return Err(ToggleError::ParentNotFound(parent_id));
                }
            }

            let now = now();
            tx.execute(
                "INSERT INTO features (name, parent_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
                (&args.name, args.parent_id, &now, &now),
            )?;
            let id = tx.last_insert_rowid();

            tracing::info!(feature_id = id, name = %args.name, parent_id = ?args.parent_id, "Created feature");

            find_feature(tx, id)?.ok_or(ToggleError::FeatureNotFound(id))
        })
    }

    /// Rename and/or reparent a feature.
    ///
    /// Moving a feature under itself or one of its descendants fails with
    /// [`ToggleError::CycleDetected`] and leaves the tree untouched.
    pub fn update_feature(&self, id: i64, args: FeatureArgs) -> Result<Feature> {
        validate_name("Feature", &args.name)?;

        self.write(|tx| {
            if !feature_exists(tx, id)? {
                return Err(ToggleError::FeatureNotFound(id));
            }
            if feature_name_taken(tx, &args.name, Some(id))? {
                return Err(ToggleError::feature_name_conflict(&args.name));
            }
            if let Some(parent_id) = args.parent_id {
                if !feature_exists(tx, parent_id)? {
                    return Err(ToggleError::ParentNotFound(parent_id));
                }
                if load_forest(tx)?.is_ancestor_or_self(id, parent_id) {
                    return Err(ToggleError::CycleDetected {
                        feature_id: id,
                        parent_id,
                    });
                }
            }

            tx.execute(
                "UPDATE features SET name = ?, parent_id = ?, updated_at = ? WHERE id = ?",
                (&args.name, args.parent_id, now(), id),
            )?;

            tracing::info!(feature_id = id, name = %args.name, parent_id = ?args.parent_id, "Updated feature");

            find_feature(tx, id)?.ok_or(ToggleError::FeatureNotFound(id))
        })
    }

    /// Delete a feature, reparenting its children to its former parent.
    ///
    /// Enablement mappings of the deleted feature are removed; those of its
    /// children are left as they are.
    pub fn delete_feature(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let parent_id: Option<i64> = tx
                .query_row("SELECT parent_id FROM features WHERE id = ?", [id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(ToggleError::FeatureNotFound(id))?;

            let reparented = tx.execute(
                "UPDATE features SET parent_id = ?, updated_at = ? WHERE parent_id = ?",
                (parent_id, now(), id),
            )?;
            tx.execute(
                "DELETE FROM feature_group_mappings WHERE feature_id = ?",
                [id],
            )?;
            tx.execute("DELETE FROM features WHERE id = ?", [id])?;

            tracing::info!(feature_id = id, reparented, "Deleted feature");
            Ok(())
        })
    }
}

fn feature_name_taken(conn: &Connection, name: &str, except: Option<i64>) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM features WHERE name = ? AND id IS NOT ?",
            (name, except),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
