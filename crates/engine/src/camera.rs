//! Camera Controller.
//!
//! Turns selection changes into camera moves. Each flight owns a
//! cancellation token; a newer request cancels the older flight outright, so
//! the camera always converges on the latest target.

use catalog::Entity;
use foundation::geo::LatLng;
use foundation::math::{shortest_lng_delta_deg, wrap_lng_deg};
use foundation::time::{Time, TimeSpan};
use surface::{CameraView, Surface};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::EngineError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FlightId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum FocusOutcome {
    /// No ready surface; the target is applied once the session is ready.
    Deferred(CameraView),
    /// Moved straight to the target.
    Jumped(CameraView),
    /// Animation started; advanced by [`CameraController::tick`].
    Started(FlightId),
}

#[derive(Debug)]
struct Flight {
    id: FlightId,
    from: CameraView,
    to: CameraView,
    span: TimeSpan,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct CameraController {
    focus_zoom: f64,
    overview: CameraView,
    current: Option<CameraView>,
    flight: Option<Flight>,
    deferred: Option<CameraView>,
    next_flight: u64,
}

impl CameraController {
    pub fn new(overview: CameraView, focus_zoom: f64) -> Self {
        Self {
            focus_zoom,
            overview,
            current: None,
            flight: None,
            deferred: None,
            next_flight: 1,
        }
    }

    pub fn overview(&self) -> CameraView {
        self.overview
    }

    /// Last view pushed to the surface.
    pub fn current_view(&self) -> Option<CameraView> {
        self.current
    }

    pub fn in_flight(&self) -> Option<FlightId> {
        self.flight.as_ref().map(|f| f.id)
    }

    /// Token of the active flight, for hosts that drive the animation
    /// themselves.
    pub fn flight_token(&self) -> Option<CancellationToken> {
        self.flight.as_ref().map(|f| f.token.clone())
    }

    /// Where a focus on `entity` lands; `None` means the overview.
    pub fn target_for(&self, entity: Option<&Entity>) -> CameraView {
        match entity {
            Some(e) => CameraView::new(e.position, self.focus_zoom),
            None => self.overview,
        }
    }

    /// Frames `entity`, or returns to the overview for `None`. Any flight in
    /// progress is cancelled first.
    pub fn focus_on<S: Surface>(
        &mut self,
        surface: Option<&mut S>,
        entity: Option<&Entity>,
        duration_ms: u64,
        now: Time,
    ) -> Result<FocusOutcome, EngineError> {
        self.cancel();
        let to = self.target_for(entity);

        let Some(surface) = surface else {
            self.deferred = Some(to);
            debug!(?to, "camera focus deferred");
            return Ok(FocusOutcome::Deferred(to));
        };

        let from = match self.current {
            Some(from) if duration_ms > 0 && from != to => from,
            _ => {
                surface.move_camera(to).map_err(EngineError::Camera)?;
                self.current = Some(to);
                return Ok(FocusOutcome::Jumped(to));
            }
        };

        let id = FlightId(self.next_flight);
        self.next_flight += 1;
        self.flight = Some(Flight {
            id,
            from,
            to,
            span: TimeSpan::new(now, now.after_millis(duration_ms)),
            token: CancellationToken::new(),
        });
        debug!(flight = id.0, ?to, duration_ms, "camera flight started");
        Ok(FocusOutcome::Started(id))
    }

    /// Applies the target requested before the surface was ready, or the
    /// overview when nothing was requested.
    pub fn on_ready<S: Surface>(&mut self, surface: &mut S) -> Result<CameraView, EngineError> {
        let to = self.deferred.take().unwrap_or(self.overview);
        surface.move_camera(to).map_err(EngineError::Camera)?;
        self.current = Some(to);
        Ok(to)
    }

    /// Advances the active flight to `now`. Returns the final view on the
    /// tick that lands exactly on the target.
    pub fn tick<S: Surface>(
        &mut self,
        surface: &mut S,
        now: Time,
    ) -> Result<Option<CameraView>, EngineError> {
        let Some(flight) = &self.flight else {
            return Ok(None);
        };
        if flight.token.is_cancelled() {
            self.flight = None;
            return Ok(None);
        }

        let t = flight.span.progress(now);
        let done = t >= 1.0;
        let view = if done {
            flight.to
        } else {
            interpolate(flight.from, flight.to, smoothstep(t))
        };

        if let Err(err) = surface.move_camera(view) {
            self.flight = None;
            return Err(EngineError::Camera(err));
        }
        self.current = Some(view);

        if done {
            debug!(flight = flight.id.0, "camera settled");
            self.flight = None;
            return Ok(Some(view));
        }
        Ok(None)
    }

    /// Cancels the active flight and any deferred target. Returns whether a
    /// flight was running. Safe to call repeatedly.
    pub fn cancel(&mut self) -> bool {
        self.deferred = None;
        match self.flight.take() {
            Some(flight) => {
                flight.token.cancel();
                debug!(flight = flight.id.0, "camera flight cancelled");
                true
            }
            None => false,
        }
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn interpolate(from: CameraView, to: CameraView, t: f64) -> CameraView {
    let lat = from.center.lat + (to.center.lat - from.center.lat) * t;
    let lng = wrap_lng_deg(
        from.center.lng + shortest_lng_delta_deg(from.center.lng, to.center.lng) * t,
    );
    CameraView::new(LatLng::new(lat, lng), from.zoom + (to.zoom - from.zoom) * t)
}
