use foundation::ids::EntityId;
use surface::CameraView;

use crate::session::InitStatus;

/// Notifications for the surrounding page, drained through
/// [`crate::AnnotationEngine::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The initialization status changed; the page swaps its loading or
    /// placeholder state accordingly.
    StatusChanged(InitStatus),
    /// Selection moved. Detail panels update in lockstep with the markers.
    SelectionChanged {
        previous: Option<EntityId>,
        current: Option<EntityId>,
    },
    /// The camera reached its latest target.
    CameraSettled(CameraView),
}
