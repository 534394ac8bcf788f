//! Seam between the overlay and the map it draws on.

use foundation::math::mercator::{DEG2RAD, RAD2DEG, WORLD_SIZE, clamp_latitude};
use foundation::math::{Coordinate, Vec2};

/// Snapshot of the host map's view state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapTransform {
    /// Viewport size in CSS pixels.
    pub width: f64,
    pub height: f64,
    pub pitch_rad: f64,
    /// Map rotation in radians; the negated bearing.
    pub angle_rad: f64,
    /// `2^zoom`.
    pub scale: f64,
    /// Map center in world pixels at the current zoom.
    pub center_px: Vec2,
}

impl MapTransform {
    /// Builds a transform from camera-style parameters (degrees).
    pub fn from_view(
        center: Coordinate,
        zoom: f64,
        bearing_deg: f64,
        pitch_deg: f64,
        width: f64,
        height: f64,
    ) -> Self {
        let scale = zoom.exp2();
        let world_size = WORLD_SIZE * scale;
        let lat = clamp_latitude(center.lat);
        let x = (180.0 + center.lon) / 360.0 * world_size;
        let y = (180.0 - RAD2DEG * (std::f64::consts::FRAC_PI_4 + lat * DEG2RAD / 2.0).tan().ln())
            / 360.0
            * world_size;
        Self {
            width,
            height,
            pitch_rad: pitch_deg * DEG2RAD,
            angle_rad: -bearing_deg * DEG2RAD,
            scale,
            center_px: Vec2::new(x, y),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    /// World size in pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        WORLD_SIZE * self.scale
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Viewport pixel to normalized device coordinates (`+y` up).
    pub fn pointer_to_ndc(&self, x: f64, y: f64) -> Option<Vec2> {
        if !self.has_area() {
            return None;
        }
        Some(Vec2::new(x / self.width * 2.0 - 1.0, -(y / self.height) * 2.0 + 1.0))
    }
}

/// The map the overlay is attached to.
pub trait MapHost {
    /// Current view state. Queried whenever the overlay re-syncs its camera.
    fn transform(&self) -> MapTransform;
}

/// A fixed view; handy when the map is driven by hand.
impl MapHost for MapTransform {
    fn transform(&self) -> MapTransform {
        *self
    }
}

/// Notifications a host forwards to the overlay.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MapEvent {
    /// The view changed (pan, zoom, rotate or pitch).
    Move,
    /// The viewport was resized.
    Resize,
    /// Pointer position in viewport pixels.
    PointerMove { x: f64, y: f64 },
}
