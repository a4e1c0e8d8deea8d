//! In-memory [`Surface`] that records every call and tracks live native
//! resources. Used by tests and by the CLI player.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use foundation::geo::LatLng;
use foundation::handles::NativeHandle;
use foundation::ids::{EntityId, LayerId};
use parking_lot::Mutex;
use scene::visibility::VisualState;

use crate::error::SurfaceError;
use crate::vocabulary::{CameraView, LayerGeometry, LayerStyle, MarkerSpec, PopupContent, Surface};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    CreateMarker {
        handle: NativeHandle,
        entity: EntityId,
        visual: VisualState,
    },
    SetMarkerVisual {
        handle: NativeHandle,
        visual: VisualState,
    },
    RemoveMarker {
        handle: NativeHandle,
    },
    RegisterPopup {
        handle: NativeHandle,
    },
    ClearPopup {
        handle: NativeHandle,
    },
    AddLayer {
        handle: NativeHandle,
        layer: LayerId,
        vertices: usize,
        visible: bool,
    },
    SetLayerVisible {
        handle: NativeHandle,
        visible: bool,
    },
    RemoveLayer {
        handle: NativeHandle,
    },
    MoveCamera(CameraView),
    Destroy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMarker {
    pub entity: EntityId,
    pub position: LatLng,
    pub visual: VisualState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveLayer {
    pub id: LayerId,
    pub vertices: usize,
    pub visible: bool,
}

/// Native resources still attached when `destroy` ran.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Leaks {
    pub markers: usize,
    pub popups: usize,
    pub layers: usize,
}

#[derive(Debug, Default)]
struct Recording {
    commands: Vec<SurfaceCommand>,
    markers: BTreeMap<NativeHandle, LiveMarker>,
    popups: BTreeSet<NativeHandle>,
    layers: BTreeMap<NativeHandle, LiveLayer>,
    camera: Option<CameraView>,
    destroyed: bool,
    destroy_calls: u32,
    calls_after_destroy: u32,
    leaks: Leaks,
    max_selected: usize,
    reject_markers_for: BTreeSet<EntityId>,
    reject_restyles_for: BTreeSet<EntityId>,
    reject_removals_for: BTreeSet<EntityId>,
}

impl Recording {
    fn selected_count(&self) -> usize {
        self.markers
            .values()
            .filter(|m| m.visual == VisualState::Selected)
            .count()
    }

    fn note_selected(&mut self) {
        self.max_selected = self.max_selected.max(self.selected_count());
    }

    fn rejects(&self, marker: NativeHandle, set: &BTreeSet<EntityId>) -> Option<EntityId> {
        self.markers
            .get(&marker)
            .map(|m| m.entity)
            .filter(|entity| set.contains(entity))
    }
}

/// Recording surface instance. Cheap handles onto its state are available
/// through [`RecordingSurface::probe`].
#[derive(Debug)]
pub struct RecordingSurface {
    generation: u32,
    next_index: u32,
    state: Arc<Mutex<Recording>>,
}

/// Read-side view of a [`RecordingSurface`], usable after the surface itself
/// has been moved into (and dropped by) its session.
#[derive(Debug, Clone)]
pub struct SurfaceProbe {
    state: Arc<Mutex<Recording>>,
}

impl RecordingSurface {
    pub fn new(generation: u32) -> Self {
        Self {
            generation,
            next_index: 0,
            state: Arc::new(Mutex::new(Recording::default())),
        }
    }

    pub fn probe(&self) -> SurfaceProbe {
        SurfaceProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn issue(&mut self) -> NativeHandle {
        let h = NativeHandle::new(self.next_index, self.generation);
        self.next_index += 1;
        h
    }

    fn check_live(&self, st: &mut Recording, handle: Option<NativeHandle>) -> Result<(), SurfaceError> {
        if st.destroyed {
            st.calls_after_destroy += 1;
            return Err(SurfaceError::Destroyed);
        }
        if let Some(h) = handle
            && h.generation() != self.generation
        {
            return Err(SurfaceError::UnknownHandle(h));
        }
        Ok(())
    }
}

impl Surface for RecordingSurface {
    fn create_marker(&mut self, marker: &MarkerSpec) -> Result<NativeHandle, SurfaceError> {
        let state = Arc::clone(&self.state);
        let mut st = state.lock();
        self.check_live(&mut st, None)?;
        if st.reject_markers_for.contains(&marker.entity) {
            return Err(SurfaceError::Rejected {
                op: "create_marker",
                reason: format!("{} rejected by test surface", marker.entity),
            });
        }
        let handle = self.issue();
        st.markers.insert(
            handle,
            LiveMarker {
                entity: marker.entity,
                position: marker.position,
                visual: marker.visual,
            },
        );
        st.commands.push(SurfaceCommand::CreateMarker {
            handle,
            entity: marker.entity,
            visual: marker.visual,
        });
        st.note_selected();
        Ok(handle)
    }

    fn set_marker_visual(
        &mut self,
        marker: NativeHandle,
        visual: VisualState,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(marker))?;
        if let Some(entity) = st.rejects(marker, &st.reject_restyles_for) {
            return Err(SurfaceError::Rejected {
                op: "set_marker_visual",
                reason: format!("{entity} rejected by test surface"),
            });
        }
        let live = st
            .markers
            .get_mut(&marker)
            .ok_or(SurfaceError::UnknownHandle(marker))?;
        live.visual = visual;
        st.commands.push(SurfaceCommand::SetMarkerVisual {
            handle: marker,
            visual,
        });
        st.note_selected();
        Ok(())
    }

    fn remove_marker(&mut self, marker: NativeHandle) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(marker))?;
        if let Some(entity) = st.rejects(marker, &st.reject_removals_for) {
            return Err(SurfaceError::Rejected {
                op: "remove_marker",
                reason: format!("{entity} rejected by test surface"),
            });
        }
        if st.markers.remove(&marker).is_none() {
            return Err(SurfaceError::UnknownHandle(marker));
        }
        st.commands.push(SurfaceCommand::RemoveMarker { handle: marker });
        Ok(())
    }

    fn register_popup(
        &mut self,
        marker: NativeHandle,
        _popup: &PopupContent,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(marker))?;
        if !st.markers.contains_key(&marker) {
            return Err(SurfaceError::UnknownHandle(marker));
        }
        st.popups.insert(marker);
        st.commands.push(SurfaceCommand::RegisterPopup { handle: marker });
        Ok(())
    }

    fn clear_popup(&mut self, marker: NativeHandle) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(marker))?;
        if !st.popups.remove(&marker) {
            return Err(SurfaceError::UnknownHandle(marker));
        }
        st.commands.push(SurfaceCommand::ClearPopup { handle: marker });
        Ok(())
    }

    fn add_layer(
        &mut self,
        layer: &LayerId,
        geometry: &LayerGeometry,
        _style: &LayerStyle,
        visible: bool,
    ) -> Result<NativeHandle, SurfaceError> {
        let state = Arc::clone(&self.state);
        let mut st = state.lock();
        self.check_live(&mut st, None)?;
        let handle = self.issue();
        let vertices = geometry.vertex_count();
        st.layers.insert(
            handle,
            LiveLayer {
                id: layer.clone(),
                vertices,
                visible,
            },
        );
        st.commands.push(SurfaceCommand::AddLayer {
            handle,
            layer: layer.clone(),
            vertices,
            visible,
        });
        Ok(handle)
    }

    fn set_layer_visible(
        &mut self,
        layer: NativeHandle,
        visible: bool,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(layer))?;
        let live = st
            .layers
            .get_mut(&layer)
            .ok_or(SurfaceError::UnknownHandle(layer))?;
        live.visible = visible;
        st.commands.push(SurfaceCommand::SetLayerVisible {
            handle: layer,
            visible,
        });
        Ok(())
    }

    fn remove_layer(&mut self, layer: NativeHandle) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, Some(layer))?;
        if st.layers.remove(&layer).is_none() {
            return Err(SurfaceError::UnknownHandle(layer));
        }
        st.commands.push(SurfaceCommand::RemoveLayer { handle: layer });
        Ok(())
    }

    fn move_camera(&mut self, view: CameraView) -> Result<(), SurfaceError> {
        let mut st = self.state.lock();
        self.check_live(&mut st, None)?;
        st.camera = Some(view);
        st.commands.push(SurfaceCommand::MoveCamera(view));
        Ok(())
    }

    fn destroy(&mut self) {
        let mut st = self.state.lock();
        st.destroy_calls += 1;
        if st.destroyed {
            return;
        }
        let leaks = Leaks {
            markers: st.markers.len(),
            popups: st.popups.len(),
            layers: st.layers.len(),
        };
        st.leaks = leaks;
        st.markers.clear();
        st.popups.clear();
        st.layers.clear();
        st.destroyed = true;
        st.commands.push(SurfaceCommand::Destroy);
    }
}

impl SurfaceProbe {
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.state.lock().commands.clone()
    }

    pub fn count_commands(&self, pred: impl Fn(&SurfaceCommand) -> bool) -> usize {
        self.state.lock().commands.iter().filter(|c| pred(c)).count()
    }

    /// Entities that currently have a marker, ascending.
    pub fn marker_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.state.lock().markers.values().map(|m| m.entity).collect();
        ids.sort();
        ids
    }

    pub fn visual_of(&self, entity: EntityId) -> Option<VisualState> {
        self.state
            .lock()
            .markers
            .values()
            .find(|m| m.entity == entity)
            .map(|m| m.visual)
    }

    pub fn selected_entities(&self) -> Vec<EntityId> {
        self.state
            .lock()
            .markers
            .values()
            .filter(|m| m.visual == VisualState::Selected)
            .map(|m| m.entity)
            .collect()
    }

    /// Most markers ever simultaneously in the selected state.
    pub fn max_selected_seen(&self) -> usize {
        self.state.lock().max_selected
    }

    pub fn popup_count(&self) -> usize {
        self.state.lock().popups.len()
    }

    pub fn layer(&self, id: &str) -> Option<LiveLayer> {
        self.state
            .lock()
            .layers
            .values()
            .find(|l| l.id.as_str() == id)
            .cloned()
    }

    pub fn layer_count(&self) -> usize {
        self.state.lock().layers.len()
    }

    pub fn camera(&self) -> Option<CameraView> {
        self.state.lock().camera
    }

    /// Markers, popups and layers currently attached.
    pub fn live_resources(&self) -> usize {
        let st = self.state.lock();
        st.markers.len() + st.popups.len() + st.layers.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn destroy_calls(&self) -> u32 {
        self.state.lock().destroy_calls
    }

    pub fn calls_after_destroy(&self) -> u32 {
        self.state.lock().calls_after_destroy
    }

    pub fn leaks(&self) -> Leaks {
        self.state.lock().leaks
    }

    /// Makes `create_marker` fail for `entity`.
    pub fn reject_markers_for(&self, entity: EntityId) {
        self.state.lock().reject_markers_for.insert(entity);
    }

    /// Makes `set_marker_visual` fail for the marker of `entity`.
    pub fn reject_restyles_for(&self, entity: EntityId) {
        self.state.lock().reject_restyles_for.insert(entity);
    }

    /// Makes `remove_marker` fail for the marker of `entity`.
    pub fn reject_removals_for(&self, entity: EntityId) {
        self.state.lock().reject_removals_for.insert(entity);
    }

    /// Lifts every injected rejection.
    pub fn accept_all(&self) {
        let mut st = self.state.lock();
        st.reject_markers_for.clear();
        st.reject_restyles_for.clear();
        st.reject_removals_for.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Leaks, RecordingSurface};
    use crate::error::SurfaceError;
    use crate::vocabulary::{LayerGeometry, LayerStyle, MarkerSpec, PopupContent, Surface};
    use foundation::geo::LatLng;
    use foundation::handles::NativeHandle;
    use foundation::ids::{EntityId, LayerId};
    use scene::visibility::VisualState;

    fn marker(id: u32) -> MarkerSpec {
        MarkerSpec {
            entity: EntityId(id),
            position: LatLng::new(0.0, 0.0),
            visual: VisualState::Normal,
            title: String::new(),
        }
    }

    #[test]
    fn tracks_live_markers_and_popups() {
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        let h = s.create_marker(&marker(4)).unwrap();
        s.register_popup(h, &PopupContent::default()).unwrap();
        assert_eq!(probe.marker_entities(), vec![EntityId(4)]);
        assert_eq!(probe.popup_count(), 1);

        s.clear_popup(h).unwrap();
        s.remove_marker(h).unwrap();
        assert_eq!(probe.live_resources(), 0);
    }

    #[test]
    fn destroy_reports_leaks_and_blocks_later_calls() {
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        s.create_marker(&marker(1)).unwrap();
        s.add_layer(
            &LayerId::from("route"),
            &LayerGeometry::Line(vec![LatLng::new(0.0, 0.0); 3]),
            &LayerStyle::default(),
            true,
        )
        .unwrap();
        s.destroy();
        assert_eq!(
            probe.leaks(),
            Leaks {
                markers: 1,
                popups: 0,
                layers: 1
            }
        );
        assert_eq!(s.create_marker(&marker(2)), Err(SurfaceError::Destroyed));
        assert_eq!(probe.calls_after_destroy(), 1);
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut s = RecordingSurface::new(2);
        let foreign = NativeHandle::new(0, 1);
        assert_eq!(
            s.remove_marker(foreign),
            Err(SurfaceError::UnknownHandle(foreign))
        );
    }

    #[test]
    fn rejected_entities_fail_creation() {
        let mut s = RecordingSurface::new(1);
        s.probe().reject_markers_for(EntityId(9));
        assert!(matches!(
            s.create_marker(&marker(9)),
            Err(SurfaceError::Rejected { .. })
        ));
        assert!(s.create_marker(&marker(8)).is_ok());
    }
}
