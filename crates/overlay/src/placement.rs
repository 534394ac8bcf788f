//! Positions objects at geographic coordinates.
//!
//! A placed object lives inside a geo group: the group carries the projected
//! position and the latitude scale, the object keeps its own local transform.

use foundation::math::mercator::{project_to_world, units_per_meter};
use foundation::math::Coordinate;
use scene::components::Transform;
use scene::entity::EntityId;
use scene::World;
use tracing::error;

use crate::config::PlacementOptions;
use crate::error::OverlayError;

/// The geo group wrapping `object`: the object itself if it is one, else its
/// direct parent if that is one.
pub fn resolve_geo_group(world: &World, object: EntityId) -> Option<EntityId> {
    if world.is_geo_group(object) {
        return Some(object);
    }
    world.parent(object).filter(|&p| world.is_geo_group(p))
}

/// Latitude scaling for this placement: an explicit option wins, then the
/// object's remembered preference, then `true`.
pub fn effective_scale_to_latitude(opts: &PlacementOptions, stored: Option<bool>) -> bool {
    opts.scale_to_latitude.or(stored).unwrap_or(true)
}

/// Moves the geo group wrapping `object` to `coordinate`.
///
/// Fails without touching the scene when `object` has no geo group.
pub fn place(
    world: &mut World,
    object: EntityId,
    coordinate: Coordinate,
    opts: &PlacementOptions,
) -> Result<Transform, OverlayError> {
    let Some(group) = resolve_geo_group(world, object) else {
        error!(%object, "cannot set geographic coordinates of an object without a geo group");
        return Err(OverlayError::MissingGeoGroup(object));
    };

    let stored = world.anchor(object).and_then(|a| a.scale_to_latitude);
    let scale_to_latitude = effective_scale_to_latitude(opts, stored);

    let mut scale = opts.pre_scale.to_vec3();
    if scale_to_latitude {
        scale = scale * units_per_meter(coordinate.lat);
    }
    let transform = Transform::translate(project_to_world(coordinate)).with_scale(scale);
    world.set_transform(group, transform);

    if let Some(anchor) = world.anchor_mut(object) {
        anchor.coordinate = Some(coordinate);
        anchor.scale_to_latitude = Some(scale_to_latitude);
    }
    Ok(transform)
}
