//! Marker Reconciler.
//!
//! Keeps the markers on the surface equal to the visible entity set, each in
//! its correct visual state. Every pass diffs against the markers it actually
//! holds, never against the state it was last asked to render, so a failed or
//! skipped operation is retried on the next pass instead of drifting.

use std::collections::{BTreeMap, VecDeque};

use catalog::{Entity, EntityCatalog};
use foundation::handles::NativeHandle;
use foundation::ids::EntityId;
use scene::entity_set::EntitySet;
use scene::view_state::ViewState;
use scene::visibility::{VisualState, visible_entities, visual_state_for};
use surface::{MarkerSpec, PopupContent, Surface, SurfaceError};
use tracing::{debug, warn};

use crate::error::EngineError;

/// A live marker. Owned exclusively by [`MarkerReconciler`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    pub entity: EntityId,
    pub native: NativeHandle,
    pub visual: VisualState,
    pub popup: bool,
}

/// Operations that take the rendered markers to the desired set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub to_remove: Vec<EntityId>,
    pub to_add: Vec<(EntityId, VisualState)>,
    /// Applied in order: demotions from `Selected` first, promotions to
    /// `Selected` last.
    pub to_restyle: Vec<(EntityId, VisualState)>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty() && self.to_restyle.is_empty()
    }
}

/// Diffs the rendered visuals against `next_visible` under `view`.
pub fn plan(
    rendered: &BTreeMap<EntityId, VisualState>,
    next_visible: &EntitySet,
    view: &ViewState,
) -> ReconcilePlan {
    let prev: EntitySet = rendered.keys().copied().collect();
    let mut out = ReconcilePlan {
        to_remove: prev.diff(next_visible).iter().collect(),
        to_add: next_visible
            .diff(&prev)
            .iter()
            .map(|id| (id, visual_state_for(id, view)))
            .collect(),
        to_restyle: Vec::new(),
    };

    let mut demotions = Vec::new();
    let mut others = Vec::new();
    let mut promotions = Vec::new();
    for id in next_visible.intersect(&prev).iter() {
        let want = visual_state_for(id, view);
        let have = rendered.get(&id).copied().unwrap_or_default();
        if have == want {
            continue;
        }
        if have == VisualState::Selected {
            demotions.push((id, want));
        } else if want == VisualState::Selected {
            promotions.push((id, want));
        } else {
            others.push((id, want));
        }
    }
    out.to_restyle.extend(demotions);
    out.to_restyle.extend(others);
    out.to_restyle.extend(promotions);
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub restyled: usize,
    /// Entities skipped this pass and why. The pass itself still completes.
    pub issues: Vec<EngineError>,
}

impl ReconcileReport {
    fn absorb(&mut self, other: ReconcileReport) {
        self.added += other.added;
        self.removed += other.removed;
        self.restyled += other.restyled;
        self.issues.extend(other.issues);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The surface is not ready; the view state was queued for replay.
    Deferred { queued: usize },
    Applied(ReconcileReport),
    /// The session was torn down; the view state was dropped.
    Discarded,
}

/// Most view states held while the surface is not ready. Past this the
/// oldest is dropped; the final markers depend only on the latest state.
pub const MAX_PENDING_VIEWS: usize = 64;

#[derive(Debug, Default)]
pub struct MarkerReconciler {
    markers: BTreeMap<EntityId, MarkerHandle>,
    pending: VecDeque<ViewState>,
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the surface in line with `view`, or queues `view` when there is
    /// no ready surface yet.
    pub fn reconcile<S: Surface>(
        &mut self,
        surface: Option<&mut S>,
        catalog: &EntityCatalog,
        view: &ViewState,
    ) -> ReconcileOutcome {
        match surface {
            Some(surface) => ReconcileOutcome::Applied(self.apply(surface, catalog, view)),
            None => {
                if self.pending.len() == MAX_PENDING_VIEWS {
                    self.pending.pop_front();
                }
                self.pending.push_back(view.clone());
                debug!(queued = self.pending.len(), "reconcile deferred");
                ReconcileOutcome::Deferred {
                    queued: self.pending.len(),
                }
            }
        }
    }

    /// Applies every queued view state in arrival order.
    pub fn replay<S: Surface>(&mut self, surface: &mut S, catalog: &EntityCatalog) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        while let Some(view) = self.pending.pop_front() {
            report.absorb(self.apply(surface, catalog, &view));
        }
        report
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn rendered_ids(&self) -> EntitySet {
        self.markers.keys().copied().collect()
    }

    pub fn handle(&self, id: EntityId) -> Option<&MarkerHandle> {
        self.markers.get(&id)
    }

    fn apply<S: Surface>(
        &mut self,
        surface: &mut S,
        catalog: &EntityCatalog,
        view: &ViewState,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let view = sanitize(view, catalog, &mut report.issues);

        let rendered: BTreeMap<EntityId, VisualState> =
            self.markers.iter().map(|(id, h)| (*id, h.visual)).collect();
        let next = visible_entities(catalog, &view);
        let plan = plan(&rendered, &next, &view);
        if plan.is_empty() {
            return report;
        }

        for id in plan.to_remove {
            let Some(mut handle) = self.markers.remove(&id) else {
                continue;
            };
            if handle.popup {
                match surface.clear_popup(handle.native) {
                    Ok(()) => handle.popup = false,
                    Err(err) => warn!(entity = %id, %err, "popup clear failed"),
                }
            }
            match surface.remove_marker(handle.native) {
                Ok(()) => report.removed += 1,
                Err(source) => {
                    warn!(entity = %id, %source, "marker removal failed");
                    // Still attached natively; keep it so the next pass retries.
                    if !matches!(source, SurfaceError::UnknownHandle(_)) {
                        self.markers.insert(id, handle);
                    }
                    report.issues.push(EngineError::Marker { entity: id, source });
                }
            }
        }

        for (id, visual) in plan.to_restyle {
            if visual == VisualState::Selected && self.other_selected(id) {
                debug!(entity = %id, "promotion held back until the old selection clears");
                continue;
            }
            let Some(handle) = self.markers.get_mut(&id) else {
                continue;
            };
            match surface.set_marker_visual(handle.native, visual) {
                Ok(()) => {
                    handle.visual = visual;
                    report.restyled += 1;
                }
                Err(source) => {
                    warn!(entity = %id, %source, "marker restyle failed");
                    report.issues.push(EngineError::Marker { entity: id, source });
                }
            }
        }

        for (id, mut visual) in plan.to_add {
            let Some(entity) = catalog.get(id) else {
                report.issues.push(EngineError::InvalidEntityReference(id));
                continue;
            };
            if visual == VisualState::Selected && self.other_selected(id) {
                visual = if view.hovered == Some(id) {
                    VisualState::Hovered
                } else {
                    VisualState::Normal
                };
            }
            match create(surface, entity, visual) {
                Ok(handle) => {
                    self.markers.insert(id, handle);
                    report.added += 1;
                }
                Err(source) => {
                    warn!(entity = %id, %source, "marker skipped");
                    report.issues.push(EngineError::Marker { entity: id, source });
                }
            }
        }

        debug!(
            added = report.added,
            removed = report.removed,
            restyled = report.restyled,
            live = self.markers.len(),
            "markers reconciled"
        );
        report
    }

    /// Whether a marker other than `id` is still shown as selected.
    fn other_selected(&self, id: EntityId) -> bool {
        self.markers
            .values()
            .any(|h| h.visual == VisualState::Selected && h.entity != id)
    }

    /// Removes every marker from a live surface.
    pub fn release<S: Surface>(&mut self, surface: &mut S) -> usize {
        let count = self.markers.len();
        for (id, handle) in std::mem::take(&mut self.markers) {
            if handle.popup
                && let Err(err) = surface.clear_popup(handle.native)
            {
                warn!(entity = %id, %err, "popup clear failed");
            }
            if let Err(err) = surface.remove_marker(handle.native) {
                warn!(entity = %id, %err, "marker removal failed");
            }
        }
        self.pending.clear();
        count
    }

    /// Drops all handles and queued work without touching a surface.
    pub fn abandon(&mut self) {
        self.markers.clear();
        self.pending.clear();
    }
}

fn create<S: Surface>(
    surface: &mut S,
    entity: &Entity,
    visual: VisualState,
) -> Result<MarkerHandle, SurfaceError> {
    let native = surface.create_marker(&MarkerSpec {
        entity: entity.id,
        position: entity.position,
        visual,
        title: entity.title(),
    })?;
    let popup = PopupContent {
        title: entity.title(),
        lines: entity
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != "name")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };
    let popup = match surface.register_popup(native, &popup) {
        Ok(()) => true,
        Err(err) => {
            warn!(entity = %entity.id, %err, "popup not registered");
            false
        }
    };
    Ok(MarkerHandle {
        entity: entity.id,
        native,
        visual,
        popup,
    })
}

/// Clears selected/hovered ids the catalog does not know.
fn sanitize(view: &ViewState, catalog: &EntityCatalog, issues: &mut Vec<EngineError>) -> ViewState {
    let mut view = view.clone();
    for slot in [&mut view.selected, &mut view.hovered] {
        if let Some(id) = *slot
            && !catalog.contains(id)
        {
            warn!(entity = %id, "view state refers to an unknown entity");
            issues.push(EngineError::InvalidEntityReference(id));
            *slot = None;
        }
    }
    view
}
