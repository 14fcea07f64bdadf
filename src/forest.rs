//! In-memory arena of the feature forest and the entitlement algorithm.
//!
//! The store loads `(id, parent_id)` edges into a [`FeatureForest`] inside a
//! read transaction, so every question answered here is answered against one
//! consistent snapshot. Nodes reference each other by id only; walks are
//! id-chasing loops guarded by a visited set so corrupt data can't loop forever.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Result, ToggleError};

#[derive(Debug, Default)]
pub struct FeatureForest {
    parents: HashMap<i64, Option<i64>>,
    children: HashMap<i64, Vec<i64>>,
    roots: Vec<i64>,
}

impl FeatureForest {
    /// Build the forest from `(id, parent_id)` edges.
    ///
    /// A node whose parent isn't part of the edge set is treated as a root.
    pub fn from_edges(edges: impl IntoIterator<Item = (i64, Option<i64>)>) -> Self {
        let parents: HashMap<i64, Option<i64>> = edges.into_iter().collect();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut roots = Vec::new();

        for (&id, &parent_id) in &parents {
            match parent_id {
                Some(parent) if parents.contains_key(&parent) => {
                    children.entry(parent).or_default().push(id)
                }
                _ => roots.push(id),
            }
        }

        roots.sort_unstable();
        for siblings in children.values_mut() {
            siblings.sort_unstable();
        }

        Self {
            parents,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    pub fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn ancestor_chain(&self, id: i64) -> Result<Vec<i64>> {
        if !self.contains(id) {
            return Err(ToggleError::FeatureNotFound(id));
        }

        let mut chain = vec![id];
        let mut visited = HashSet::from([id]);
        let mut current = id;

        while let Some(parent) = self.parent_in_forest(current) {
            if !visited.insert(parent) {
                return Err(ToggleError::CycleDetected {
                    feature_id: id,
                    parent_id: parent,
                });
            }
            chain.push(parent);
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// True if `ancestor` is `id` itself or lies on `id`'s path to the root.
    ///
    /// Used to reject reparenting: a feature may not move under itself or one of
    /// its descendants.
    pub fn is_ancestor_or_self(&self, ancestor: i64, id: i64) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            if !visited.insert(node) {
                // A corrupt cycle that doesn't include `ancestor`.
                return false;
            }
            current = self.parent_in_forest(node);
        }
        false
    }

    /// A feature is effective iff every node of its ancestor chain is enabled.
    pub fn is_effective(&self, id: i64, enabled: &HashSet<i64>) -> Result<bool> {
        Ok(self
            .ancestor_chain(id)?
            .iter()
            .all(|node| enabled.contains(node)))
    }

    /// All effectively enabled features, in breadth-first order from the roots.
    ///
    /// A single top-down pass: a child is only visited once its parent has been
    /// found effective, so disabled branches are trimmed as soon as they are seen
    /// and each node is examined at most once.
    pub fn effective_set(&self, enabled: &HashSet<i64>) -> Vec<i64> {
        let mut result = Vec::new();
        let mut queue: VecDeque<i64> = self
            .roots
            .iter()
            .copied()
            .filter(|id| enabled.contains(id))
            .collect();

        while let Some(id) = queue.pop_front() {
            result.push(id);
            queue.extend(
                self.children(id)
                    .iter()
                    .copied()
                    .filter(|child| enabled.contains(child)),
            );
        }

        result
    }

    fn parent_in_forest(&self, id: i64) -> Option<i64> {
        self.parents
            .get(&id)
            .copied()
            .flatten()
            .filter(|parent| self.contains(*parent))
    }
}
