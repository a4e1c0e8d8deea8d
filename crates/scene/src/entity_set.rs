use std::collections::BTreeSet;

use foundation::ids::EntityId;

/// Deterministic set of entity ids.
///
/// Ordering contract:
/// - Iteration yields ids in ascending order.
/// - Set operations return new sets and never reorder their inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    ids: BTreeSet<EntityId>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.ids.remove(&id)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.union(&other.ids).copied().collect(),
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.intersection(&other.ids).copied().collect(),
        }
    }

    /// Set difference: `self \ other`.
    pub fn diff(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.difference(&other.ids).copied().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<EntityId> for EntitySet {
    fn from_iter<T: IntoIterator<Item = EntityId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
