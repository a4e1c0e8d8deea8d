use foundation::ids::{EntityId, LayerId};
use surface::SurfaceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayersError {
    /// The caller named a layer the manager never registered.
    #[error("no overlay layer registered as '{0}'")]
    InvalidLayerReference(LayerId),
    #[error("overlay '{layer}' refers to unknown {entity}")]
    InvalidEntityReference { layer: LayerId, entity: EntityId },
    #[error("overlay '{0}' registered twice")]
    DuplicateLayer(LayerId),
    #[error("overlay '{layer}' has unusable geometry: {reason}")]
    InvalidGeometry { layer: LayerId, reason: String },
    #[error("invalid colour '{0}', expected #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("surface call for overlay '{layer}' failed: {source}")]
    Surface {
        layer: LayerId,
        #[source]
        source: SurfaceError,
    },
}
