use std::cmp::Ordering;

use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Vec2, Vec3};

use crate::World;
use crate::entity::EntityId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    /// Ray from a perspective camera through a point in normalized device
    /// coordinates (`[-1, 1]` on both axes, `+y` up).
    ///
    /// The origin is the camera position; the direction points at the
    /// unprojected `(ndc.x, ndc.y, 0.5)` clip-space point.
    pub fn from_camera(ndc: Vec2, camera_world: &Mat4, projection: &Mat4) -> Option<Self> {
        let inv_projection = projection.inverse()?;
        let origin = camera_world.transform_point(Vec3::ZERO);
        let view_point = inv_projection.transform_point(Vec3::new(ndc.x, ndc.y, 0.5));
        let target = camera_world.transform_point(view_point);
        let dir = (target - origin).normalize()?;
        Some(Self { origin, dir })
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Intersects a ray with the world-space bounds of the candidate meshes.
///
/// Ordering contract:
/// - Hits are sorted by distance along the (normalized) ray.
/// - Hits at the same distance are ordered by ascending `EntityId::index()`.
///
/// Notes:
/// - Candidates that are not meshes, not attached to the root, or hidden are
///   ignored.
/// - A ray starting inside a mesh's bounds hits it at distance 0.
pub fn intersect_all<I>(world: &World, ray: Ray, candidates: I, opts: PickOptions) -> Vec<PickHit>
where
    I: IntoIterator<Item = EntityId>,
{
    let Some(dir) = ray.dir.normalize() else {
        return Vec::new();
    };
    let origin = ray.origin.as_array();
    let dir_a = dir.as_array();

    let mut hits = Vec::new();
    for entity in candidates {
        if !world.is_attached(entity) || !world.is_visible(entity) {
            continue;
        }
        let Some(bounds) = world.world_bounds(entity) else {
            continue;
        };
        let Some(t) = ray_aabb_hit_t(origin, dir_a, bounds, 0.0, opts.max_distance) else {
            continue;
        };
        hits.push(PickHit {
            entity,
            distance: t,
            point: ray.origin + dir * t,
        });
    }

    hits.sort_by(|a, b| {
        distance_order(a.distance, b.distance)
            .then_with(|| a.entity.index().cmp(&b.entity.index()))
    });
    hits
}

/// Nearest hit among the candidates, if any.
pub fn pick_ray<I>(world: &World, ray: Ray, candidates: I, opts: PickOptions) -> Option<PickHit>
where
    I: IntoIterator<Item = EntityId>,
{
    intersect_all(world, ray, candidates, opts).into_iter().next()
}

/// Total order on hit distances with `-0.0 == 0.0`.
fn distance_order(a: f64, b: f64) -> Ordering {
    let canon = |v: f64| if v == 0.0 { 0.0 } else { v };
    canon(a).total_cmp(&canon(b))
}

fn ray_aabb_hit_t(
    origin: [f64; 3],
    dir: [f64; 3],
    bounds: Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> Option<f64> {
    // Slabs intersection; returns entry distance.
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (min, max) = (bounds.min[axis], bounds.max[axis]);

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }

    Some(t_min.max(0.0))
}
