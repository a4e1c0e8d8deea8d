//! Metric names recorded by the engine.

pub const MARKERS_CREATED: &str = "markers.created";
pub const MARKERS_REMOVED: &str = "markers.removed";
pub const MARKERS_RESTYLED: &str = "markers.restyled";
pub const MARKER_ISSUES: &str = "markers.issues";
pub const RECONCILE_PASSES: &str = "reconcile.passes";
pub const RECONCILE_DEFERRED: &str = "reconcile.deferred";
pub const CAMERA_FLIGHTS_STARTED: &str = "camera.flights_started";
pub const CAMERA_FLIGHTS_CANCELLED: &str = "camera.flights_cancelled";
pub const LOADS_STALE: &str = "session.loads_stale";

// Gauges
pub const LIVE_MARKERS: &str = "markers.live";
