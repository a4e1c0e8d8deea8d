use serde::Deserialize;

/// Which rendering capability to acquire, and with what credentials.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SurfaceConfig {
    /// Tile-based map library; requires an access token.
    #[serde(rename_all = "camelCase")]
    Map {
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default = "default_style_url")]
        style_url: String,
    },
    /// Procedurally drawn canvas; needs no credentials.
    #[serde(rename_all = "camelCase")]
    Canvas {
        #[serde(default)]
        background: Option<String>,
    },
}

fn default_style_url() -> String {
    "mapbox://styles/mapbox/light-v11".to_string()
}

impl SurfaceConfig {
    pub fn map(access_token: Option<&str>) -> Self {
        SurfaceConfig::Map {
            access_token: access_token.map(str::to_string),
            style_url: default_style_url(),
        }
    }

    pub fn canvas() -> Self {
        SurfaceConfig::Canvas { background: None }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SurfaceConfig::Map { .. } => "map",
            SurfaceConfig::Canvas { .. } => "canvas",
        }
    }

    /// `false` when a map surface has no usable access token.
    pub fn has_credentials(&self) -> bool {
        match self {
            SurfaceConfig::Map { access_token, .. } => access_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty()),
            SurfaceConfig::Canvas { .. } => true,
        }
    }
}
