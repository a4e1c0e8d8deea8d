use catalog::EntityCatalog;
use foundation::geo::LatLng;
use foundation::ids::{EntityId, LayerId};
use serde::Deserialize;
use surface::{LayerGeometry, LayerStyle};

use crate::error::LayersError;
use crate::geometry::catchment_ring;
use crate::symbology::StyleSpec;

/// Overlay declaration as written in page configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySpec {
    pub id: String,
    #[serde(flatten)]
    pub source: OverlaySource,
    #[serde(default)]
    pub style: StyleSpec,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

fn default_segments() -> u32 {
    128
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlaySource {
    /// Line through the listed entities, in order.
    Route { entities: Vec<u32> },
    /// Line through explicit `[lat, lng]` pairs.
    Path { coordinates: Vec<[f64; 2]> },
    /// Coverage circle around an entity.
    #[serde(rename_all = "camelCase")]
    Catchment {
        entity: u32,
        radius_m: f64,
        #[serde(default = "default_segments")]
        segments: u32,
    },
}

/// Static overlay geometry plus its presentation. Built once, never rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub id: LayerId,
    pub geometry: LayerGeometry,
    pub style: LayerStyle,
    pub default_visible: bool,
}

impl OverlayLayer {
    pub fn new(id: impl Into<LayerId>, geometry: LayerGeometry, default_visible: bool) -> Self {
        Self {
            id: id.into(),
            geometry,
            style: LayerStyle::default(),
            default_visible,
        }
    }

    /// Resolves `spec` against the catalog into concrete geometry.
    pub fn build(spec: &OverlaySpec, catalog: &EntityCatalog) -> Result<Self, LayersError> {
        let id = LayerId::new(spec.id.clone());
        let invalid = |reason: &str| LayersError::InvalidGeometry {
            layer: id.clone(),
            reason: reason.to_string(),
        };

        let geometry = match &spec.source {
            OverlaySource::Route { entities } => {
                let mut points = Vec::with_capacity(entities.len());
                for raw in entities {
                    let entity = catalog.get(EntityId(*raw)).ok_or_else(|| {
                        LayersError::InvalidEntityReference {
                            layer: id.clone(),
                            entity: EntityId(*raw),
                        }
                    })?;
                    points.push(entity.position);
                }
                if points.len() < 2 {
                    return Err(invalid("a route needs at least two entities"));
                }
                LayerGeometry::Line(points)
            }
            OverlaySource::Path { coordinates } => {
                let points: Vec<LatLng> = coordinates
                    .iter()
                    .map(|[lat, lng]| LatLng::new(*lat, *lng))
                    .collect();
                if points.len() < 2 {
                    return Err(invalid("a path needs at least two coordinates"));
                }
                if points.iter().any(|p| !p.is_valid()) {
                    return Err(invalid("path coordinate out of range"));
                }
                LayerGeometry::Line(points)
            }
            OverlaySource::Catchment {
                entity,
                radius_m,
                segments,
            } => {
                let center = catalog
                    .get(EntityId(*entity))
                    .ok_or_else(|| LayersError::InvalidEntityReference {
                        layer: id.clone(),
                        entity: EntityId(*entity),
                    })?
                    .position;
                if !radius_m.is_finite() || *radius_m <= 0.0 {
                    return Err(invalid("catchment radius must be positive"));
                }
                LayerGeometry::Polygon(catchment_ring(center, *radius_m, *segments))
            }
        };

        Ok(Self {
            id,
            geometry,
            style: spec.style.to_style()?,
            default_visible: spec.visible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{OverlayLayer, OverlaySource, OverlaySpec};
    use crate::error::LayersError;
    use catalog::{Entity, EntityCatalog};
    use foundation::geo::LatLng;
    use foundation::ids::EntityId;
    use pretty_assertions::assert_eq;
    use surface::LayerGeometry;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Entity::new(1, LatLng::new(10.0, 10.0), "stop"),
            Entity::new(2, LatLng::new(10.5, 10.5), "stop"),
            Entity::new(3, LatLng::new(11.0, 10.0), "depot"),
        ])
        .unwrap()
    }

    #[test]
    fn deserializes_each_kind() {
        let specs: Vec<OverlaySpec> = serde_json::from_str(
            r##"[
                {"id": "line", "kind": "route", "entities": [1, 2, 3]},
                {"id": "raw", "kind": "path", "coordinates": [[0, 0], [1, 1]], "visible": false},
                {"id": "ring", "kind": "catchment", "entity": 3, "radiusM": 800,
                 "style": {"color": "#ff880080"}}
            ]"##,
        )
        .unwrap();
        assert_eq!(
            specs[0].source,
            OverlaySource::Route {
                entities: vec![1, 2, 3]
            }
        );
        assert!(!specs[1].visible);
        assert_eq!(
            specs[2].source,
            OverlaySource::Catchment {
                entity: 3,
                radius_m: 800.0,
                segments: 128
            }
        );
    }

    #[test]
    fn route_follows_entity_order() {
        let spec = OverlaySpec {
            id: "route".into(),
            source: OverlaySource::Route {
                entities: vec![3, 1],
            },
            style: Default::default(),
            visible: true,
        };
        let layer = OverlayLayer::build(&spec, &catalog()).unwrap();
        assert_eq!(
            layer.geometry,
            LayerGeometry::Line(vec![LatLng::new(11.0, 10.0), LatLng::new(10.0, 10.0)])
        );
    }

    #[test]
    fn unknown_entity_is_reported() {
        let spec = OverlaySpec {
            id: "ring".into(),
            source: OverlaySource::Catchment {
                entity: 42,
                radius_m: 100.0,
                segments: 32,
            },
            style: Default::default(),
            visible: true,
        };
        let err = OverlayLayer::build(&spec, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            LayersError::InvalidEntityReference {
                entity: EntityId(42),
                ..
            }
        ));
    }

    #[test]
    fn catchment_builds_a_ring() {
        let spec = OverlaySpec {
            id: "ring".into(),
            source: OverlaySource::Catchment {
                entity: 2,
                radius_m: 1_000.0,
                segments: 256,
            },
            style: Default::default(),
            visible: false,
        };
        let layer = OverlayLayer::build(&spec, &catalog()).unwrap();
        assert_eq!(layer.geometry.vertex_count(), 256);
        assert!(!layer.default_visible);
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        let spec = OverlaySpec {
            id: "short".into(),
            source: OverlaySource::Route { entities: vec![1] },
            style: Default::default(),
            visible: true,
        };
        assert!(matches!(
            OverlayLayer::build(&spec, &catalog()),
            Err(LayersError::InvalidGeometry { .. })
        ));
    }
}
