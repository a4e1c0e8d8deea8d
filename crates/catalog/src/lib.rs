//! Entity Catalog: the immutable list of points of interest a page supplies.
//!
//! The catalog is validated once at load time and never mutated afterwards.
//! Everything downstream only reads it, usually through an `Arc`.

use std::collections::{BTreeMap, HashMap};

use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use foundation::ids::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entity category used by the page's filter controls.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category(value.to_string())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub position: LatLng,
    pub category: Category,
    /// Free-form display text (name, address, opening hours, ...).
    pub fields: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(id: u32, position: LatLng, category: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            position,
            category: Category::new(category),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The `name` field, falling back to the id.
    pub fn title(&self) -> String {
        self.fields
            .get("name")
            .cloned()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Wire form of an entity as it appears in page data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: u32,
    pub lat: f64,
    pub lng: f64,
    pub category: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl From<EntityRecord> for Entity {
    fn from(r: EntityRecord) -> Self {
        Entity {
            id: EntityId(r.id),
            position: LatLng::new(r.lat, r.lng),
            category: Category(r.category),
            fields: r.fields,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate entity id {0}")]
    DuplicateId(EntityId),
    #[error("{id} has invalid coordinates {position}")]
    InvalidCoordinates { id: EntityId, position: LatLng },
    #[error("{0} has an empty category")]
    EmptyCategory(EntityId),
    #[error("catalog data malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable, validated entity list in page order.
#[derive(Debug, Default, Clone)]
pub struct EntityCatalog {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl EntityCatalog {
    pub fn new(entities: Vec<Entity>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entities.len());
        for (pos, e) in entities.iter().enumerate() {
            if !e.position.is_valid() {
                return Err(CatalogError::InvalidCoordinates {
                    id: e.id,
                    position: e.position,
                });
            }
            if e.category.0.trim().is_empty() {
                return Err(CatalogError::EmptyCategory(e.id));
            }
            if index.insert(e.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(e.id));
            }
        }
        Ok(Self { entities, index })
    }

    pub fn from_records(records: Vec<EntityRecord>) -> Result<Self, CatalogError> {
        Self::new(records.into_iter().map(Entity::from).collect())
    }

    /// Parses a JSON array of [`EntityRecord`]s.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<EntityRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&pos| &self.entities[pos])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of `id` in page order.
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Iterates entities in page order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&Category> {
        let mut out: Vec<&Category> = Vec::new();
        for e in &self.entities {
            if !out.contains(&&e.category) {
                out.push(&e.category);
            }
        }
        out
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.entities.iter().map(|e| e.position))
    }
}
