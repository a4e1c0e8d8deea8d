use foundation::ids::{ContainerId, EntityId};
use layers::LayersError;
use surface::{SurfaceError, SurfaceInitError};
use thiserror::Error;

/// Lifecycle failures of a [`crate::session::SurfaceSession`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no access token configured for the {kind} surface")]
    CredentialsMissing { kind: &'static str },
    #[error(transparent)]
    SurfaceInit(#[from] SurfaceInitError),
    #[error("container '{0}' already hosts a surface")]
    ContainerInUse(ContainerId),
    /// A load finished after its attempt was cancelled or superseded. Never
    /// surfaced past the engine.
    #[error("load result arrived after its session moved on")]
    StaleOperation,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Layers(#[from] LayersError),
    #[error("view state refers to unknown {0}")]
    InvalidEntityReference(EntityId),
    #[error("marker operation for {entity} failed: {source}")]
    Marker {
        entity: EntityId,
        #[source]
        source: SurfaceError,
    },
    #[error("camera move failed: {0}")]
    Camera(#[source] SurfaceError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
}
