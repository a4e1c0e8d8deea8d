//! Surface Session: sole owner of one native rendering surface.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized ──initialize──► Loading ──complete_load(Ok)──► Ready
//!       │                          │  └─complete_load(Err)──► Failed ──initialize──► Loading
//!       │                          │
//!       └──────────── teardown (from any state) ──────────────► Destroyed
//! ```
//!
//! Every load attempt carries a [`CancellationToken`]. `teardown` cancels it,
//! and `complete_load` checks it before acting, so a load that resolves after
//! unmount does no work beyond releasing the instance it produced.

use std::sync::atomic::{AtomicU64, Ordering};

use foundation::ids::ContainerId;
use surface::{Surface, SurfaceConfig, SurfaceInitError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::container::{ContainerLease, ContainerRegistry};
use crate::error::SessionError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Why a session could not become ready.
#[derive(Debug, Clone, PartialEq)]
pub enum InitFailure {
    CredentialsMissing,
    SurfaceInit(SurfaceInitError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Uninitialized,
    Loading,
    Ready,
    Failed(InitFailure),
    Destroyed,
}

/// Initialization status as reported to the page.
#[derive(Debug, Clone, PartialEq)]
pub enum InitStatus {
    Uninitialized,
    Loading,
    Ready,
    Error(InitFailure),
}

impl InitStatus {
    /// The page shows a static, non-interactive placeholder in this state.
    pub fn shows_placeholder(&self) -> bool {
        matches!(self, InitStatus::Error(_))
    }
}

/// One load attempt handed to the host, which acquires the surface and
/// reports back through [`SurfaceSession::complete_load`].
#[derive(Debug, Clone)]
pub struct LoadTicket {
    session: SessionId,
    attempt: u32,
    container: ContainerId,
    config: SurfaceConfig,
    token: CancellationToken,
}

impl LoadTicket {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Cancelled once the requester no longer wants the result. Loaders may
    /// use it to abort early.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

type ReadyCallback<S> = Box<dyn FnOnce(&mut S)>;

pub struct SurfaceSession<S: Surface> {
    id: SessionId,
    state: LifecycleState,
    registry: ContainerRegistry,
    lease: Option<ContainerLease>,
    attempt: u32,
    token: Option<CancellationToken>,
    surface: Option<S>,
    ready_callbacks: Vec<ReadyCallback<S>>,
}

impl<S: Surface> SurfaceSession<S> {
    pub fn new(registry: ContainerRegistry) -> Self {
        Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            state: LifecycleState::Uninitialized,
            registry,
            lease: None,
            attempt: 0,
            token: None,
            surface: None,
            ready_callbacks: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn status(&self) -> InitStatus {
        match &self.state {
            LifecycleState::Uninitialized | LifecycleState::Destroyed => InitStatus::Uninitialized,
            LifecycleState::Loading => InitStatus::Loading,
            LifecycleState::Ready => InitStatus::Ready,
            LifecycleState::Failed(f) => InitStatus::Error(f.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    pub fn container(&self) -> Option<&ContainerId> {
        self.lease.as_ref().map(|l| l.container())
    }

    /// Starts a load attempt.
    ///
    /// Returns `Ok(None)` without side effects when the session is already
    /// loading, ready or destroyed. From `Failed` this is an explicit retry.
    pub fn initialize(
        &mut self,
        container: ContainerId,
        config: &SurfaceConfig,
    ) -> Result<Option<LoadTicket>, SessionError> {
        match self.state {
            LifecycleState::Loading | LifecycleState::Ready | LifecycleState::Destroyed => {
                debug!(session = self.id.0, state = ?self.state, "initialize ignored");
                return Ok(None);
            }
            LifecycleState::Uninitialized | LifecycleState::Failed(_) => {}
        }

        if self.lease.as_ref().map(|l| l.container()) != Some(&container) {
            self.lease = None;
            self.lease = Some(self.registry.claim(container.clone())?);
        }

        if !config.has_credentials() {
            warn!(session = self.id.0, kind = config.kind_name(), "surface credentials missing");
            self.state = LifecycleState::Failed(InitFailure::CredentialsMissing);
            return Err(SessionError::CredentialsMissing {
                kind: config.kind_name(),
            });
        }

        self.attempt += 1;
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.state = LifecycleState::Loading;
        info!(
            session = self.id.0,
            attempt = self.attempt,
            kind = config.kind_name(),
            %container,
            "surface loading"
        );

        Ok(Some(LoadTicket {
            session: self.id,
            attempt: self.attempt,
            container,
            config: config.clone(),
            token,
        }))
    }

    /// Registers work to run once, right after the session becomes ready.
    ///
    /// Runs immediately if the session is already ready; dropped unrun if the
    /// session is torn down first.
    pub fn on_ready(&mut self, callback: impl FnOnce(&mut S) + 'static) {
        match (&self.state, self.surface.as_mut()) {
            (LifecycleState::Ready, Some(surface)) => callback(surface),
            (LifecycleState::Destroyed, _) => {
                debug!(session = self.id.0, "ready callback dropped after teardown");
            }
            _ => self.ready_callbacks.push(Box::new(callback)),
        }
    }

    /// Delivers the outcome of the load described by `ticket`.
    ///
    /// A result for a cancelled or superseded attempt yields
    /// [`SessionError::StaleOperation`]; a surface delivered that way is
    /// destroyed on the spot.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<S, SurfaceInitError>,
    ) -> Result<(), SessionError> {
        let current = ticket.session == self.id
            && ticket.attempt == self.attempt
            && self.state == LifecycleState::Loading
            && !ticket.token.is_cancelled();
        if !current {
            debug!(
                session = self.id.0,
                attempt = ticket.attempt,
                cancelled = ticket.token.is_cancelled(),
                "stale surface load discarded"
            );
            if let Ok(mut late) = result {
                late.destroy();
            }
            return Err(SessionError::StaleOperation);
        }

        self.token = None;
        match result {
            Ok(mut surface) => {
                for callback in self.ready_callbacks.drain(..) {
                    callback(&mut surface);
                }
                self.surface = Some(surface);
                self.state = LifecycleState::Ready;
                info!(session = self.id.0, "surface ready");
                Ok(())
            }
            Err(err) => {
                warn!(session = self.id.0, %err, "surface failed to load");
                self.state = LifecycleState::Failed(InitFailure::SurfaceInit(err.clone()));
                Err(SessionError::SurfaceInit(err))
            }
        }
    }

    /// The live surface; `None` unless the session is ready.
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        if self.state != LifecycleState::Ready {
            return None;
        }
        self.surface.as_mut()
    }

    /// Releases everything the session owns. Safe from any state and
    /// idempotent.
    pub fn teardown(&mut self) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.ready_callbacks.clear();
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
        }
        self.lease = None;
        debug!(session = self.id.0, from = ?self.state, "session destroyed");
        self.state = LifecycleState::Destroyed;
    }
}

impl<S: Surface> Drop for SurfaceSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{InitFailure, InitStatus, LifecycleState, SurfaceSession};
    use crate::container::ContainerRegistry;
    use crate::error::SessionError;
    use foundation::geo::LatLng;
    use foundation::ids::{ContainerId, EntityId};
    use scene::visibility::VisualState;
    use surface::{MarkerSpec, RecordingSurface, Surface, SurfaceConfig, SurfaceInitError};

    fn session() -> SurfaceSession<RecordingSurface> {
        SurfaceSession::new(ContainerRegistry::new())
    }

    fn canvas() -> SurfaceConfig {
        SurfaceConfig::canvas()
    }

    #[test]
    fn initialize_is_idempotent_while_loading_or_ready() {
        let mut s = session();
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        assert!(s.initialize("map".into(), &canvas()).unwrap().is_none());
        assert_eq!(s.status(), InitStatus::Loading);

        s.complete_load(ticket, Ok(RecordingSurface::new(1))).unwrap();
        assert!(s.initialize("map".into(), &canvas()).unwrap().is_none());
        assert!(s.is_ready());
    }

    #[test]
    fn missing_credentials_fail_without_a_ticket() {
        let mut s = session();
        let err = s
            .initialize("map".into(), &SurfaceConfig::map(None))
            .unwrap_err();
        assert_eq!(err, SessionError::CredentialsMissing { kind: "map" });
        assert_eq!(s.status(), InitStatus::Error(InitFailure::CredentialsMissing));
        assert!(s.status().shows_placeholder());
        assert!(s.surface_mut().is_none());
    }

    #[test]
    fn load_failure_is_reported_and_retry_is_manual() {
        let mut s = session();
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        let err = s
            .complete_load(ticket, Err(SurfaceInitError::new("script 404")))
            .unwrap_err();
        assert!(matches!(err, SessionError::SurfaceInit(_)));
        assert!(matches!(
            s.state(),
            LifecycleState::Failed(InitFailure::SurfaceInit(_))
        ));

        let retry = s.initialize("map".into(), &canvas()).unwrap();
        assert!(retry.is_some());
    }

    #[test]
    fn surface_is_gated_until_ready() {
        let mut s = session();
        assert!(s.surface_mut().is_none());
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        assert!(s.surface_mut().is_none());
        s.complete_load(ticket, Ok(RecordingSurface::new(1))).unwrap();
        assert!(s.surface_mut().is_some());
    }

    #[test]
    fn teardown_while_loading_discards_the_late_surface() {
        let mut s = session();
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        let token = ticket.token().clone();
        s.teardown();
        assert!(token.is_cancelled());

        let late = RecordingSurface::new(1);
        let probe = late.probe();
        let err = s.complete_load(ticket, Ok(late)).unwrap_err();
        assert_eq!(err, SessionError::StaleOperation);
        assert!(probe.is_destroyed());
        assert_eq!(probe.destroy_calls(), 1);
        assert_eq!(probe.commands().len(), 1);
        assert_eq!(*s.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn teardown_from_ready_destroys_exactly_once() {
        let mut s = session();
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        let surface = RecordingSurface::new(1);
        let probe = surface.probe();
        s.complete_load(ticket, Ok(surface)).unwrap();

        s.teardown();
        s.teardown();
        drop(s);
        assert_eq!(probe.destroy_calls(), 1);
    }

    #[test]
    fn teardown_from_uninitialized_is_safe() {
        let mut s = session();
        s.teardown();
        assert_eq!(*s.state(), LifecycleState::Destroyed);
        assert!(s.initialize("map".into(), &canvas()).unwrap().is_none());
    }

    #[test]
    fn ready_callbacks_run_once_in_order() {
        let mut s = session();
        let runs = Rc::new(Cell::new(0u32));
        let r1 = Rc::clone(&runs);
        s.on_ready(move |surface: &mut RecordingSurface| {
            assert_eq!(r1.get(), 0);
            r1.set(1);
            surface
                .create_marker(&MarkerSpec {
                    entity: EntityId(1),
                    position: LatLng::new(0.0, 0.0),
                    visual: VisualState::Normal,
                    title: String::new(),
                })
                .unwrap();
        });
        let r2 = Rc::clone(&runs);
        s.on_ready(move |_| r2.set(r2.get() * 10 + 2));

        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        let surface = RecordingSurface::new(1);
        let probe = surface.probe();
        s.complete_load(ticket, Ok(surface)).unwrap();
        assert_eq!(runs.get(), 12);
        assert_eq!(probe.marker_entities(), vec![EntityId(1)]);
    }

    #[test]
    fn ready_callbacks_are_dropped_on_teardown() {
        let mut s = session();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        s.on_ready(move |_| r.set(true));
        let ticket = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        s.teardown();
        let _ = s.complete_load(ticket, Ok(RecordingSurface::new(1)));
        assert!(!ran.get());
    }

    #[test]
    fn sessions_cannot_share_a_container() {
        let reg = ContainerRegistry::new();
        let mut a: SurfaceSession<RecordingSurface> = SurfaceSession::new(reg.clone());
        let mut b: SurfaceSession<RecordingSurface> = SurfaceSession::new(reg.clone());
        a.initialize("map".into(), &canvas()).unwrap();
        let err = b.initialize("map".into(), &canvas()).unwrap_err();
        assert_eq!(err, SessionError::ContainerInUse(ContainerId::from("map")));

        a.teardown();
        assert!(b.initialize("map".into(), &canvas()).unwrap().is_some());
    }

    #[test]
    fn ticket_from_a_superseded_attempt_is_stale() {
        let mut s = session();
        let first = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        s.complete_load(first.clone(), Err(SurfaceInitError::new("timeout")))
            .unwrap_err();
        let _second = s.initialize("map".into(), &canvas()).unwrap().unwrap();
        let late = RecordingSurface::new(9);
        let probe = late.probe();
        assert_eq!(
            s.complete_load(first, Ok(late)).unwrap_err(),
            SessionError::StaleOperation
        );
        assert!(probe.is_destroyed());
        assert_eq!(s.status(), InitStatus::Loading);
    }
}
