use catalog::EntityCatalog;
use foundation::geo::LatLng;
use layers::OverlaySpec;
use serde::Deserialize;
use surface::{CameraView, SurfaceConfig};

use crate::error::EngineError;

/// Everything a page supplies to mount the annotation engine, apart from the
/// catalog itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    pub focus_zoom: f64,
    pub fly_duration_ms: u64,
    pub overview_zoom: f64,
    /// Fixed overview framing. When absent the catalog's bounding-box centre
    /// is used at `overview_zoom`.
    pub overview: Option<ViewSpec>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focus_zoom: 14.0,
            fly_duration_ms: 800,
            overview_zoom: 11.0,
            overview: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct ViewSpec {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

impl EngineConfig {
    pub fn new(surface: SurfaceConfig) -> Self {
        Self {
            surface,
            camera: CameraConfig::default(),
            overlays: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn with_overlay(mut self, overlay: OverlaySpec) -> Self {
        self.overlays.push(overlay);
        self
    }
}

impl CameraConfig {
    pub fn overview_view(&self, catalog: &EntityCatalog) -> CameraView {
        if let Some(v) = self.overview {
            return CameraView::new(LatLng::new(v.lat, v.lng), v.zoom);
        }
        let center = catalog
            .bounds()
            .map(|b| b.center())
            .unwrap_or(LatLng::new(0.0, 0.0));
        CameraView::new(center, self.overview_zoom)
    }
}
