use serde::Deserialize;

pub use layers::{PlacementOptions, PreScale};

/// Vertical field of view of the map's own camera (radians).
pub const MAP_FOV_RAD: f64 = 0.643_501_108_793_284_4;

/// How consecutive hover hit lists are compared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoverComparison {
    /// Fire only when the number of hits changes. A swap between meshes with
    /// an unchanged hit count is silent.
    #[default]
    Count,
    /// Fire for every mesh that was not hit in the previous frame.
    Identity,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayOptions {
    pub hover_comparison: HoverComparison,
    /// Ambient light on the scene plus a directional "sun" in the world group.
    pub default_lights: bool,
    pub fov_rad: f64,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            hover_comparison: HoverComparison::Count,
            default_lights: true,
            fov_rad: MAP_FOV_RAD,
        }
    }
}

impl OverlayOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_hover_comparison(mut self, comparison: HoverComparison) -> Self {
        self.hover_comparison = comparison;
        self
    }
}
