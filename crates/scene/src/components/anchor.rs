use foundation::math::Coordinate;

/// Geographic bookkeeping stored on a placed object.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GeoAnchor {
    /// Last coordinate the object was moved to.
    pub coordinate: Option<Coordinate>,
    /// Latitude-scaling preference remembered from the last placement.
    pub scale_to_latitude: Option<bool>,
}
