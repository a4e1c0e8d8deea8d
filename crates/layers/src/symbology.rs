use serde::Deserialize;
use surface::LayerStyle;

use crate::error::LayersError;

/// Style as written in page configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSpec {
    pub color: String,
    pub width_px: f32,
    pub fill_opacity: f32,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            color: "#2272d9".to_string(),
            width_px: 2.0,
            fill_opacity: 0.15,
        }
    }
}

impl StyleSpec {
    pub fn to_style(&self) -> Result<LayerStyle, LayersError> {
        Ok(LayerStyle {
            color: parse_hex_color(&self.color)?,
            width_px: self.width_px.max(0.0),
            fill_opacity: self.fill_opacity.clamp(0.0, 1.0),
        })
    }
}

/// Parses `#rrggbb` / `#rrggbbaa` into linear RGBA components.
pub fn parse_hex_color(s: &str) -> Result<[f32; 4], LayersError> {
    let invalid = || LayersError::InvalidColor(s.to_string());
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }
    let mut out = [1.0f32; 4];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).map_err(|_| invalid())?;
        let v = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        out[i] = v as f32 / 255.0;
    }
    Ok(out)
}
