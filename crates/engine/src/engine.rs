//! The annotation engine: one mounted map or canvas surface, kept in sync
//! with the page's view state.
//!
//! The engine never mutates the [`ViewState`] it is handed. It reacts to each
//! new state by reconciling markers, focusing the camera on selection
//! changes, and toggling overlay layers, all through one [`SurfaceSession`].

use std::sync::Arc;

use catalog::EntityCatalog;
use foundation::ids::{ContainerId, EntityId, LayerId};
use layers::{OverlayLayer, OverlayLayerManager};
use runtime::{Event, EventBus, Frame, Metrics};
use scene::entity_set::EntitySet;
use scene::view_state::ViewState;
use surface::{CameraView, Surface, SurfaceInitError};
use tracing::{debug, info, warn};

use crate::camera::{CameraController, FocusOutcome};
use crate::config::EngineConfig;
use crate::container::ContainerRegistry;
use crate::counters;
use crate::error::{EngineError, SessionError};
use crate::events::EngineEvent;
use crate::reconciler::{MarkerReconciler, ReconcileOutcome, ReconcileReport};
use crate::session::{InitStatus, LifecycleState, LoadTicket, SurfaceSession};

/// What one view-state update did.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub markers: ReconcileOutcome,
    /// Present only when the selection changed.
    pub camera: Option<FocusOutcome>,
    /// Consistency problems that were logged and skipped.
    pub issues: Vec<EngineError>,
}

pub struct AnnotationEngine<S: Surface> {
    catalog: Arc<EntityCatalog>,
    config: EngineConfig,
    session: SurfaceSession<S>,
    reconciler: MarkerReconciler,
    camera: CameraController,
    overlays: OverlayLayerManager,
    view: Option<ViewState>,
    status: InitStatus,
    frame: Frame,
    events: EventBus<EngineEvent>,
    metrics: Metrics,
}

impl<S: Surface> AnnotationEngine<S> {
    /// Builds overlay geometry up front; an overlay that references unknown
    /// entities or has unusable geometry is rejected here.
    pub fn new(
        catalog: Arc<EntityCatalog>,
        config: EngineConfig,
        registry: ContainerRegistry,
    ) -> Result<Self, EngineError> {
        let layers = config
            .overlays
            .iter()
            .map(|spec| OverlayLayer::build(spec, &catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let overlays = OverlayLayerManager::new(layers)?;
        let camera = CameraController::new(
            config.camera.overview_view(&catalog),
            config.camera.focus_zoom,
        );

        Ok(Self {
            catalog,
            config,
            session: SurfaceSession::new(registry),
            reconciler: MarkerReconciler::new(),
            camera,
            overlays,
            view: None,
            status: InitStatus::Uninitialized,
            frame: Frame::default(),
            events: EventBus::new(),
            metrics: Metrics::new(),
        })
    }

    /// A view state with every overlay at its configured visibility.
    pub fn initial_view_state(&self) -> ViewState {
        let mut view = ViewState::default();
        for id in self.overlays.layer_ids() {
            if let Ok(visible) = self.overlays.is_visible(id) {
                view.layer_visibility.insert(id.clone(), visible);
            }
        }
        view
    }

    /// Starts acquiring the surface for `container`.
    ///
    /// Returns the ticket the host completes via [`Self::on_surface_loaded`],
    /// or `None` if a load is already under way or done. Calling this again
    /// after a failure is a manual retry.
    pub fn mount(
        &mut self,
        container: impl Into<ContainerId>,
    ) -> Result<Option<LoadTicket>, EngineError> {
        let result = self.session.initialize(container.into(), &self.config.surface);
        self.refresh_status();
        Ok(result?)
    }

    /// Delivers the host's load result for `ticket`.
    ///
    /// Results for a cancelled or superseded attempt are discarded silently.
    pub fn on_surface_loaded(
        &mut self,
        ticket: LoadTicket,
        result: Result<S, SurfaceInitError>,
    ) -> Result<(), EngineError> {
        match self.session.complete_load(ticket, result) {
            Ok(()) => {}
            Err(SessionError::StaleOperation) => {
                self.metrics.inc_counter(counters::LOADS_STALE, 1);
                return Ok(());
            }
            Err(err) => {
                self.refresh_status();
                return Err(err.into());
            }
        }

        let Some(surface) = self.session.surface_mut() else {
            return Ok(());
        };

        for err in self.overlays.install(surface) {
            warn!(%err, "overlay install issue");
        }

        let replayed = self.reconciler.pending();
        let report = self.reconciler.replay(surface, &self.catalog);
        let landed = self.camera.on_ready(surface);

        self.record_markers(&report);
        self.metrics
            .inc_counter(counters::RECONCILE_PASSES, replayed as u64);
        self.refresh_status();
        info!(replayed, markers = self.reconciler.rendered_ids().len(), "engine ready");

        let view = landed?;
        self.events.emit(self.frame, EngineEvent::CameraSettled(view));
        Ok(())
    }

    /// Registers extra work to run once the surface is ready.
    pub fn on_surface_ready(&mut self, callback: impl FnOnce(&mut S) + 'static) {
        self.session.on_ready(callback);
    }

    /// Reacts to a new view state from the page. After [`Self::unmount`]
    /// the update is discarded.
    pub fn on_view_state(&mut self, view: &ViewState) -> UpdateReport {
        if *self.session.state() == LifecycleState::Destroyed {
            debug!(session = self.session.id().0, "view state after unmount discarded");
            return UpdateReport {
                markers: ReconcileOutcome::Discarded,
                camera: None,
                issues: Vec::new(),
            };
        }
        let mut issues = Vec::new();

        // Selection of an id the catalog lacks counts as no selection.
        let known = |id: &EntityId| self.catalog.contains(*id);
        let previous = self.view.as_ref().and_then(|v| v.selected).filter(known);
        let current = view.selected.filter(known);
        if let Some(id) = view.selected
            && current.is_none()
        {
            issues.push(EngineError::InvalidEntityReference(id));
        }
        let camera = if current != previous {
            self.events.emit(
                self.frame,
                EngineEvent::SelectionChanged { previous, current },
            );
            self.focus(current, &mut issues)
        } else {
            None
        };

        let markers = self
            .reconciler
            .reconcile(self.session.surface_mut(), &self.catalog, view);
        self.metrics.inc_counter(counters::RECONCILE_PASSES, 1);
        match &markers {
            ReconcileOutcome::Deferred { .. } => {
                self.metrics.inc_counter(counters::RECONCILE_DEFERRED, 1);
            }
            ReconcileOutcome::Applied(report) => {
                self.record_markers(report);
                for issue in &report.issues {
                    if !issues.contains(issue) {
                        issues.push(issue.clone());
                    }
                }
            }
            ReconcileOutcome::Discarded => {}
        }

        issues.extend(
            self.overlays
                .sync(
                    self.session.surface_mut(),
                    self.view.as_ref().map(|v| &v.layer_visibility),
                    &view.layer_visibility,
                )
                .into_iter()
                .map(EngineError::from),
        );

        self.view = Some(view.clone());
        UpdateReport {
            markers,
            camera,
            issues,
        }
    }

    fn focus(
        &mut self,
        selected: Option<EntityId>,
        issues: &mut Vec<EngineError>,
    ) -> Option<FocusOutcome> {
        let entity = selected.and_then(|id| self.catalog.get(id));

        if self.camera.cancel() {
            self.metrics
                .inc_counter(counters::CAMERA_FLIGHTS_CANCELLED, 1);
        }
        let outcome = self.camera.focus_on(
            self.session.surface_mut(),
            entity,
            self.config.camera.fly_duration_ms,
            self.frame.time,
        );
        match outcome {
            Ok(FocusOutcome::Started(id)) => {
                self.metrics.inc_counter(counters::CAMERA_FLIGHTS_STARTED, 1);
                Some(FocusOutcome::Started(id))
            }
            Ok(FocusOutcome::Jumped(view)) => {
                self.events.emit(self.frame, EngineEvent::CameraSettled(view));
                Some(FocusOutcome::Jumped(view))
            }
            Ok(deferred) => Some(deferred),
            Err(err) => {
                warn!(%err, "camera focus failed");
                issues.push(err);
                None
            }
        }
    }

    /// Shows or hides one overlay layer directly.
    pub fn set_layer_visible(&mut self, layer: &LayerId, visible: bool) -> Result<bool, EngineError> {
        Ok(self
            .overlays
            .set_visible(self.session.surface_mut(), layer, visible)?)
    }

    /// Advances the camera to `frame`. Returns the landing view when a
    /// flight settles on this frame.
    pub fn tick(&mut self, frame: Frame) -> Result<Option<CameraView>, EngineError> {
        self.frame = frame;
        let Some(surface) = self.session.surface_mut() else {
            return Ok(None);
        };
        let landed = self.camera.tick(surface, frame.time)?;
        if let Some(view) = landed {
            self.events.emit(frame, EngineEvent::CameraSettled(view));
        }
        Ok(landed)
    }

    /// Releases every marker, layer and the surface itself. Safe from any
    /// state; later calls do nothing.
    pub fn unmount(&mut self) {
        if self.camera.cancel() {
            self.metrics
                .inc_counter(counters::CAMERA_FLIGHTS_CANCELLED, 1);
        }
        match self.session.surface_mut() {
            Some(surface) => {
                let removed = self.reconciler.release(surface);
                self.overlays.release(surface);
                self.metrics
                    .inc_counter(counters::MARKERS_REMOVED, removed as u64);
            }
            None => {
                self.reconciler.abandon();
                self.overlays.abandon();
            }
        }
        self.session.teardown();
        self.metrics.set_gauge(counters::LIVE_MARKERS, 0);
        self.refresh_status();
        debug!(session = self.session.id().0, "engine unmounted");
    }

    pub fn status(&self) -> &InitStatus {
        &self.status
    }

    pub fn drain_events(&mut self) -> Vec<Event<EngineEvent>> {
        self.events.drain()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn rendered_ids(&self) -> EntitySet {
        self.reconciler.rendered_ids()
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn session(&self) -> &SurfaceSession<S> {
        &self.session
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// The last view state applied or queued.
    pub fn view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }

    fn record_markers(&mut self, report: &ReconcileReport) {
        self.metrics
            .inc_counter(counters::MARKERS_CREATED, report.added as u64);
        self.metrics
            .inc_counter(counters::MARKERS_REMOVED, report.removed as u64);
        self.metrics
            .inc_counter(counters::MARKERS_RESTYLED, report.restyled as u64);
        self.metrics
            .inc_counter(counters::MARKER_ISSUES, report.issues.len() as u64);
        self.metrics.set_gauge(
            counters::LIVE_MARKERS,
            self.reconciler.rendered_ids().len() as i64,
        );
    }

    fn refresh_status(&mut self) {
        let status = self.session.status();
        if status != self.status {
            info!(?status, "engine status changed");
            self.status = status.clone();
            self.events.emit(self.frame, EngineEvent::StatusChanged(status));
        }
    }
}

impl<S: Surface> Drop for AnnotationEngine<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}
