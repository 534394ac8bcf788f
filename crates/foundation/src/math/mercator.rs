//! Spherical Mercator projection matched to a 512px slippy-map world.
//!
//! World space is the 3D scene's coordinate system: at zoom 0 one unit is one
//! map pixel. `x` grows westward and `y` grows southward before the camera
//! synchronizer flips both axes with its world-group rotation.

use std::f64::consts::{FRAC_PI_4, PI};

use super::Vec3;

/// Size of the map world in pixels at zoom 0.
pub const WORLD_SIZE: f64 = 512.0;
/// Spherical Mercator radius (EPSG:3857, meters).
pub const MERCATOR_A: f64 = 6_378_137.0;
/// Scale from Mercator meters to world units.
pub const PROJECTION_WORLD_SIZE: f64 = WORLD_SIZE / (MERCATOR_A * PI) / 2.0;
/// Equatorial circumference used for the meters-per-unit factor.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_000.0;
pub const DEG2RAD: f64 = PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / PI;
/// Latitude at which the square Web Mercator world ends.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;

/// Geographic position: longitude and latitude in degrees, altitude in meters.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    pub alt_m: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64, alt_m: f64) -> Self {
        Self { lon, lat, alt_m }
    }

    /// Ground-level coordinate.
    pub fn lon_lat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 0.0)
    }

    /// Reads `[lon, lat]` or `[lon, lat, alt]`.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match *values {
            [lon, lat] => Some(Self::lon_lat(lon, lat)),
            [lon, lat, alt_m] => Some(Self::new(lon, lat, alt_m)),
            _ => None,
        }
    }
}

/// Clamps a latitude into the range the projection can represent.
pub fn clamp_latitude(lat_deg: f64) -> f64 {
    lat_deg.clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
}

/// World units per meter at the given latitude.
///
/// Grows with `1 / cos(lat)`; latitudes beyond the Mercator limit are clamped.
pub fn units_per_meter(lat_deg: f64) -> f64 {
    let lat = clamp_latitude(lat_deg) * DEG2RAD;
    (WORLD_SIZE * (1.0 / lat.cos()) / EARTH_CIRCUMFERENCE).abs()
}

pub fn project_to_world(coord: Coordinate) -> Vec3 {
    let lat = clamp_latitude(coord.lat);
    let x = -MERCATOR_A * coord.lon * DEG2RAD * PROJECTION_WORLD_SIZE;
    let y = -MERCATOR_A * (FRAC_PI_4 + 0.5 * lat * DEG2RAD).tan().ln() * PROJECTION_WORLD_SIZE;
    let z = coord.alt_m * units_per_meter(lat);
    Vec3::new(x, y, z)
}

pub fn unproject_from_world(p: Vec3) -> Coordinate {
    let lon = -p.x / (MERCATOR_A * DEG2RAD * PROJECTION_WORLD_SIZE);
    let lat = 2.0 * ((p.y / (PROJECTION_WORLD_SIZE * -MERCATOR_A)).exp().atan() - FRAC_PI_4)
        / DEG2RAD;
    let alt_m = p.z / units_per_meter(lat);
    Coordinate::new(lon, lat, alt_m)
}

/// Rescales meter-offset vertices around `center` into world units.
pub fn scale_vertices_to_meters(center: Coordinate, vertices: &mut [Vec3]) {
    let k = units_per_meter(center.lat);
    for v in vertices.iter_mut() {
        *v = *v * k;
    }
}
