use foundation::geo::LatLng;
use foundation::handles::NativeHandle;
use foundation::ids::{EntityId, LayerId};
use scene::visibility::VisualState;

use crate::error::SurfaceError;

/// Viewport framing: centre and zoom level.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub center: LatLng,
    pub zoom: f64,
}

impl CameraView {
    pub const fn new(center: LatLng, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub entity: EntityId,
    pub position: LatLng,
    pub visual: VisualState,
    pub title: String,
}

/// Popup body bound to a marker: a title and ordered key/value lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupContent {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerGeometry {
    Line(Vec<LatLng>),
    /// Closed ring; the first vertex is not repeated at the end.
    Polygon(Vec<LatLng>),
}

impl LayerGeometry {
    pub fn vertex_count(&self) -> usize {
        match self {
            LayerGeometry::Line(v) | LayerGeometry::Polygon(v) => v.len(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub color: [f32; 4],
    pub width_px: f32,
    /// Fill alpha for polygons; ignored for lines.
    pub fill_opacity: f32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            color: [0.13, 0.45, 0.85, 1.0],
            width_px: 2.0,
            fill_opacity: 0.15,
        }
    }
}

/// A live rendering surface.
///
/// Implementations wrap exactly one native instance. Every handle they return
/// is only meaningful to the instance that issued it.
pub trait Surface {
    fn create_marker(&mut self, marker: &MarkerSpec) -> Result<NativeHandle, SurfaceError>;

    fn set_marker_visual(
        &mut self,
        marker: NativeHandle,
        visual: VisualState,
    ) -> Result<(), SurfaceError>;

    fn remove_marker(&mut self, marker: NativeHandle) -> Result<(), SurfaceError>;

    fn register_popup(
        &mut self,
        marker: NativeHandle,
        popup: &PopupContent,
    ) -> Result<(), SurfaceError>;

    fn clear_popup(&mut self, marker: NativeHandle) -> Result<(), SurfaceError>;

    fn add_layer(
        &mut self,
        layer: &LayerId,
        geometry: &LayerGeometry,
        style: &LayerStyle,
        visible: bool,
    ) -> Result<NativeHandle, SurfaceError>;

    fn set_layer_visible(&mut self, layer: NativeHandle, visible: bool)
    -> Result<(), SurfaceError>;

    fn remove_layer(&mut self, layer: NativeHandle) -> Result<(), SurfaceError>;

    fn move_camera(&mut self, view: CameraView) -> Result<(), SurfaceError>;

    /// Releases the native instance and every listener attached to it.
    ///
    /// Called exactly once per instance, by its owning session.
    fn destroy(&mut self);
}
