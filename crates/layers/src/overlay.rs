//! Overlay Layer Manager.
//!
//! Overlays are registered up front, installed on the surface exactly once
//! when the session becomes ready, and from then on only shown or hidden.
//! Geometry is never re-added.

use std::collections::BTreeMap;

use foundation::handles::NativeHandle;
use foundation::ids::LayerId;
use surface::Surface;
use tracing::{debug, warn};

use crate::error::LayersError;
use crate::layer::OverlayLayer;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InstallState {
    Pending,
    Installed,
    Released,
}

#[derive(Debug)]
struct Slot {
    layer: OverlayLayer,
    visible: bool,
    native: Option<NativeHandle>,
}

#[derive(Debug)]
pub struct OverlayLayerManager {
    slots: BTreeMap<LayerId, Slot>,
    state: InstallState,
}

impl OverlayLayerManager {
    pub fn new(layers: Vec<OverlayLayer>) -> Result<Self, LayersError> {
        let mut slots = BTreeMap::new();
        for layer in layers {
            let id = layer.id.clone();
            let slot = Slot {
                visible: layer.default_visible,
                layer,
                native: None,
            };
            if slots.insert(id.clone(), slot).is_some() {
                return Err(LayersError::DuplicateLayer(id));
            }
        }
        Ok(Self {
            slots,
            state: InstallState::Pending,
        })
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &LayerId> + '_ {
        self.slots.keys()
    }

    /// Desired visibility of `id`, whether or not it is installed yet.
    pub fn is_visible(&self, id: &LayerId) -> Result<bool, LayersError> {
        self.slots
            .get(id)
            .map(|s| s.visible)
            .ok_or_else(|| LayersError::InvalidLayerReference(id.clone()))
    }

    /// Adds every registered layer to `surface`. Runs once per manager; later
    /// calls do nothing. A layer the surface rejects is skipped and reported.
    pub fn install<S: Surface>(&mut self, surface: &mut S) -> Vec<LayersError> {
        if self.state != InstallState::Pending {
            debug!(state = ?self.state, "overlay install skipped");
            return Vec::new();
        }
        self.state = InstallState::Installed;

        let mut failures = Vec::new();
        for (id, slot) in &mut self.slots {
            match surface.add_layer(id, &slot.layer.geometry, &slot.layer.style, slot.visible) {
                Ok(handle) => slot.native = Some(handle),
                Err(source) => {
                    warn!(layer = %id, %source, "overlay layer not installed");
                    failures.push(LayersError::Surface {
                        layer: id.clone(),
                        source,
                    });
                }
            }
        }
        debug!(
            installed = self.slots.values().filter(|s| s.native.is_some()).count(),
            "overlay layers installed"
        );
        failures
    }

    /// Shows or hides `id`. Returns whether the desired visibility changed.
    ///
    /// Before installation (or with no live surface) only the desired state is
    /// recorded; it is applied at install time.
    pub fn set_visible<S: Surface>(
        &mut self,
        surface: Option<&mut S>,
        id: &LayerId,
        visible: bool,
    ) -> Result<bool, LayersError> {
        let installed = self.state == InstallState::Installed;
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| LayersError::InvalidLayerReference(id.clone()))?;
        if slot.visible == visible {
            return Ok(false);
        }
        slot.visible = visible;

        if installed
            && let (Some(surface), Some(native)) = (surface, slot.native)
        {
            surface
                .set_layer_visible(native, visible)
                .map_err(|source| LayersError::Surface {
                    layer: id.clone(),
                    source,
                })?;
        }
        Ok(true)
    }

    /// Applies the flags in `next` that differ from `previous`. A layer whose
    /// flag did not change keeps whatever visibility it has now, including
    /// one set directly through [`Self::set_visible`]. Unknown ids are
    /// reported, the rest still apply.
    pub fn sync<S: Surface>(
        &mut self,
        mut surface: Option<&mut S>,
        previous: Option<&BTreeMap<LayerId, bool>>,
        next: &BTreeMap<LayerId, bool>,
    ) -> Vec<LayersError> {
        let mut errors = Vec::new();
        for (id, visible) in next {
            if previous.and_then(|p| p.get(id)) == Some(visible) {
                continue;
            }
            if let Err(err) = self.set_visible(surface.as_deref_mut(), id, *visible) {
                errors.push(err);
            }
        }
        errors
    }

    /// Removes installed geometry from `surface`. The manager cannot be
    /// installed again afterwards.
    pub fn release<S: Surface>(&mut self, surface: &mut S) {
        for (id, slot) in &mut self.slots {
            if let Some(native) = slot.native.take()
                && let Err(err) = surface.remove_layer(native)
            {
                warn!(layer = %id, %err, "overlay layer removal failed");
            }
        }
        self.state = InstallState::Released;
    }

    /// Forgets native handles without touching a surface, for sessions that
    /// never became ready.
    pub fn abandon(&mut self) {
        for slot in self.slots.values_mut() {
            slot.native = None;
        }
        self.state = InstallState::Released;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{InstallState, OverlayLayerManager};
    use crate::error::LayersError;
    use crate::layer::OverlayLayer;
    use foundation::geo::LatLng;
    use foundation::ids::LayerId;
    use surface::{LayerGeometry, RecordingSurface, SurfaceCommand};

    fn layers() -> Vec<OverlayLayer> {
        vec![
            OverlayLayer::new(
                "route",
                LayerGeometry::Line(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]),
                true,
            ),
            OverlayLayer::new(
                "coverage",
                LayerGeometry::Polygon(vec![LatLng::new(0.0, 0.0); 300]),
                false,
            ),
        ]
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut l = layers();
        l.push(l[0].clone());
        assert!(matches!(
            OverlayLayerManager::new(l),
            Err(LayersError::DuplicateLayer(_))
        ));
    }

    #[test]
    fn installs_exactly_once() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        assert!(m.install(&mut s).is_empty());
        assert!(m.install(&mut s).is_empty());
        assert_eq!(m.state(), InstallState::Installed);
        assert_eq!(
            probe.count_commands(|c| matches!(c, SurfaceCommand::AddLayer { .. })),
            2
        );
        assert!(!probe.layer("coverage").unwrap().visible);
    }

    #[test]
    fn toggling_never_re_adds_geometry() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);
        let coverage = LayerId::from("coverage");

        assert!(m.set_visible(Some(&mut s), &coverage, true).unwrap());
        assert!(m.set_visible(Some(&mut s), &coverage, false).unwrap());

        assert_eq!(probe.layer_count(), 2);
        assert_eq!(probe.layer("coverage").unwrap().vertices, 300);
        assert!(!probe.layer("coverage").unwrap().visible);
        assert_eq!(
            probe.count_commands(|c| matches!(c, SurfaceCommand::AddLayer { .. })),
            2
        );
        assert_eq!(
            probe.count_commands(|c| matches!(c, SurfaceCommand::RemoveLayer { .. })),
            0
        );
    }

    #[test]
    fn unchanged_flag_is_not_sent() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);
        assert!(!m.set_visible(Some(&mut s), &LayerId::from("route"), true).unwrap());
        assert_eq!(
            probe.count_commands(|c| matches!(c, SurfaceCommand::SetLayerVisible { .. })),
            0
        );
    }

    #[test]
    fn unknown_layer_is_an_error() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let err = m
            .set_visible::<RecordingSurface>(None, &LayerId::from("nope"), true)
            .unwrap_err();
        assert_eq!(err, LayersError::InvalidLayerReference(LayerId::from("nope")));
    }

    #[test]
    fn visibility_before_install_is_applied_at_install() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        m.set_visible::<RecordingSurface>(None, &LayerId::from("coverage"), true)
            .unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);
        assert!(probe.layer("coverage").unwrap().visible);
    }

    #[test]
    fn sync_reports_unknown_ids_and_applies_the_rest() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);

        let mut flags = BTreeMap::new();
        flags.insert(LayerId::from("coverage"), true);
        flags.insert(LayerId::from("ghost"), true);
        let errors = m.sync(Some(&mut s), None, &flags);
        assert_eq!(errors.len(), 1);
        assert!(probe.layer("coverage").unwrap().visible);
    }

    #[test]
    fn sync_leaves_unchanged_flags_alone() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);
        let route = LayerId::from("route");
        m.set_visible(Some(&mut s), &route, false).unwrap();

        let mut before = BTreeMap::new();
        before.insert(route.clone(), true);
        before.insert(LayerId::from("coverage"), false);
        let mut after = before.clone();
        after.insert(LayerId::from("coverage"), true);

        assert!(m.sync(Some(&mut s), Some(&before), &after).is_empty());
        assert!(!probe.layer("route").unwrap().visible);
        assert!(probe.layer("coverage").unwrap().visible);
        assert_eq!(m.is_visible(&route), Ok(false));
    }

    #[test]
    fn release_removes_everything_and_blocks_reinstall() {
        let mut m = OverlayLayerManager::new(layers()).unwrap();
        let mut s = RecordingSurface::new(1);
        let probe = s.probe();
        m.install(&mut s);
        m.release(&mut s);
        assert_eq!(probe.layer_count(), 0);
        assert!(m.install(&mut s).is_empty());
        assert_eq!(probe.layer_count(), 0);
    }
}
