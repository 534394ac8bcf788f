use std::collections::BTreeSet;

use foundation::math::mercator::{self, project_to_world, unproject_from_world};
use foundation::math::{Coordinate, Vec2, Vec3};
use gpu::camera::PerspectiveCamera;
use gpu::renderer::{RenderBackend, Renderer};
use layers::{FeatureCollection, Layer, LayerId, LayerRegistry, SymbolLayer, SymbolLayerOptions};
use runtime::event_bus::EventBus;
use runtime::frame::Frame;
use runtime::job::Job;
use runtime::scheduler::Scheduler;
use scene::components::{Drawable3D, Light, Transform};
use scene::picking::{PickOptions, Ray, intersect_all};
use scene::{EntityId, EntitySet, World};
use tracing::{debug, error, info, trace, warn};

use crate::camera_sync::CameraSync;
use crate::config::{OverlayOptions, PlacementOptions};
use crate::error::OverlayError;
use crate::host::{MapEvent, MapHost, MapTransform};
use crate::hover::{HoverCallbacks, HoverDispatcher};
use crate::placement;

/// Scheduler id of the per-frame job.
pub const FRAME_JOB_ID: &str = "overlay.frame";

// Camera parameters before the first sync replaces the projection.
const INITIAL_FOV_DEG: f64 = 28.0;
const INITIAL_NEAR: f64 = 0.000_001;
const INITIAL_FAR: f64 = 5.0e9;

const AMBIENT_COLOR: u32 = 0xcccccc;
const SUN_COLOR: u32 = 0xffffff;
const SUN_INTENSITY: f64 = 0.5;
const SUN_POSITION: Vec3 = Vec3::new(0.0, 800.0, 1000.0);

/// Counters kept across frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub events_applied: u64,
    pub last_hit_count: usize,
    pub mesh_over_calls: u64,
    pub mesh_out_calls: u64,
}

/// A 3D scene drawn on top of a slippy map.
///
/// All scene mutation happens through `&mut self`: host notifications are
/// queued with [`Overlay::notify`] and applied at the start of the next frame,
/// placement calls run synchronously between frames.
pub struct Overlay<H: MapHost, B: RenderBackend> {
    host: H,
    backend: B,
    options: OverlayOptions,
    world: World,
    world_group: EntityId,
    camera: PerspectiveCamera,
    camera_sync: CameraSync,
    hover: HoverDispatcher,
    hoverables: EntitySet,
    pointer_ndc: Vec2,
    layers: LayerRegistry,
    events: EventBus<MapEvent>,
    current_frame: u64,
    stats: FrameStats,
}

impl<H: MapHost, B: RenderBackend> Overlay<H, B> {
    pub fn new(host: H, mut backend: B, options: OverlayOptions) -> Self {
        let t = host.transform();
        let mut world = World::new();
        let world_group = world.spawn_group();
        world.add_child(world.root(), world_group);

        let aspect = if t.has_area() { t.width / t.height } else { 1.0 };
        let mut camera =
            PerspectiveCamera::new(INITIAL_FOV_DEG.to_radians(), aspect, INITIAL_NEAR, INITIAL_FAR);
        let mut camera_sync = CameraSync::new(options.fov_rad);
        if let Some(m) = camera_sync.setup_camera(&t, &mut camera) {
            world.set_local_matrix(world_group, Some(m));
        }
        backend.resize(viewport_px(t.width), viewport_px(t.height));

        let hover = HoverDispatcher::new(options.hover_comparison, HoverCallbacks::new());
        let mut overlay = Self {
            host,
            backend,
            options,
            world,
            world_group,
            camera,
            camera_sync,
            hover,
            hoverables: EntitySet::new(),
            pointer_ndc: Vec2::default(),
            layers: LayerRegistry::new(),
            events: EventBus::new(),
            current_frame: 0,
            stats: FrameStats::default(),
        };
        if overlay.options.default_lights {
            overlay.add_default_lights();
        }
        info!(
            width = t.width,
            height = t.height,
            zoom = t.zoom(),
            comparison = ?overlay.options.hover_comparison,
            "overlay ready"
        );
        overlay
    }

    pub fn with_hover_callbacks(mut self, callbacks: HoverCallbacks) -> Self {
        self.hover.set_callbacks(callbacks);
        self
    }

    pub fn set_hover_callbacks(&mut self, callbacks: HoverCallbacks) {
        self.hover.set_callbacks(callbacks);
    }

    fn add_default_lights(&mut self) {
        let ambient = self.world.spawn_light(Light::ambient(AMBIENT_COLOR));
        self.world.add_child(self.world.root(), ambient);

        let sun = self.world.spawn_light(Light::directional(SUN_COLOR, SUN_INTENSITY));
        self.world.set_transform(sun, Transform::translate(SUN_POSITION));
        self.world.add_child(self.world_group, sun);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host. Changes to its view take effect on the next
    /// [`MapEvent::Move`] or [`MapEvent::Resize`].
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Group holding every placed object; driven by the camera sync.
    pub fn world_group(&self) -> EntityId {
        self.world_group
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn hover(&self) -> &HoverDispatcher {
        &self.hover
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Pointer position in normalized device coordinates.
    pub fn pointer_ndc(&self) -> Vec2 {
        self.pointer_ndc
    }

    /// Meshes that take part in hover detection.
    pub fn hoverables(&self) -> &EntitySet {
        &self.hoverables
    }

    /// Queues a host notification for the next frame.
    pub fn notify(&mut self, event: MapEvent) {
        self.events.emit(self.current_frame, event);
    }

    pub fn arm_hover(&mut self) {
        debug!("hover armed");
        self.hover.arm();
    }

    /// Re-reads the host view and updates the camera and world group.
    pub fn sync_camera(&mut self) {
        let t = self.host.transform();
        if let Some(m) = self.camera_sync.update_camera(&t, &mut self.camera) {
            self.world.set_local_matrix(self.world_group, Some(m));
        }
    }

    fn resize(&mut self) {
        let t = self.host.transform();
        self.backend.resize(viewport_px(t.width), viewport_px(t.height));
        if let Some(m) = self.camera_sync.setup_camera(&t, &mut self.camera) {
            self.world.set_local_matrix(self.world_group, Some(m));
        }
    }

    fn apply_events(&mut self) {
        for event in self.events.drain() {
            trace!(frame = event.frame_index, payload = ?event.payload, "map event");
            match event.payload {
                MapEvent::Move => self.sync_camera(),
                MapEvent::Resize => self.resize(),
                MapEvent::PointerMove { x, y } => {
                    if let Some(ndc) = self.host.transform().pointer_to_ndc(x, y) {
                        self.pointer_ndc = ndc;
                    }
                }
            }
            self.stats.events_applied += 1;
        }
    }

    /// Hoverable meshes under the pointer, nearest first.
    pub fn raycast(&self) -> Vec<EntityId> {
        let Some(ray) = Ray::from_camera(self.pointer_ndc, &self.camera.world, &self.camera.projection)
        else {
            return Vec::new();
        };
        intersect_all(&self.world, ray, self.hoverables.iter(), PickOptions::default())
            .into_iter()
            .map(|hit| hit.entity)
            .collect()
    }

    /// One animation frame: apply queued events, update hover, render.
    pub fn frame(&mut self, frame: Frame) {
        self.current_frame = frame.index;
        if frame.is_first() {
            debug!(hoverables = self.hoverables.len(), "first overlay frame");
        }
        self.apply_events();

        let hits = self.raycast();
        let outcome = self.hover.dispatch(&hits);

        let render_frame = Renderer::collect(&self.world, &self.camera);
        self.backend.render(&render_frame);

        self.stats.frames += 1;
        self.stats.last_hit_count = hits.len();
        self.stats.mesh_over_calls += outcome.over as u64;
        self.stats.mesh_out_calls += outcome.out as u64;
        trace!(
            frame = frame.index,
            time_s = frame.time.seconds(),
            hits = hits.len(),
            meshes = render_frame.mesh_count(),
            "overlay frame"
        );
    }

    pub fn project_to_world(&self, coordinate: Coordinate) -> Vec3 {
        project_to_world(coordinate)
    }

    pub fn unproject_from_world(&self, point: Vec3) -> Coordinate {
        unproject_from_world(point)
    }

    pub fn units_per_meter(&self, lat_deg: f64) -> f64 {
        mercator::units_per_meter(lat_deg)
    }

    /// Not supported; always `None`.
    pub fn project_to_screen(&self, coordinate: Coordinate) -> Option<Vec2> {
        warn!(?coordinate, "project_to_screen is not implemented");
        None
    }

    /// Not supported; always `None`.
    pub fn unproject_from_screen(&self, pixel: Vec2) -> Option<Coordinate> {
        warn!(?pixel, "unproject_from_screen is not implemented");
        None
    }

    /// Spawns a mesh that is not yet part of the scene.
    pub fn spawn_mesh(&mut self, drawable: Drawable3D) -> EntityId {
        self.world.spawn_mesh(drawable)
    }

    /// Wraps `object` in a new geo group under the world group and moves it
    /// to `coordinate`. Meshes in the object's subtree become hoverable.
    pub fn add_at_coordinate(
        &mut self,
        object: EntityId,
        coordinate: Coordinate,
        opts: PlacementOptions,
    ) -> Result<EntityId, OverlayError> {
        if !self.world.contains(object) || object == self.world.root() || object == self.world_group {
            error!(%object, "cannot place an object that is not a free scene node");
            return Err(OverlayError::UnknownEntity(object));
        }
        if self.world.is_geo_group(object) {
            error!(%object, "cannot wrap a geo group in another geo group");
            return Err(OverlayError::NestedGeoGroup(object));
        }

        let previous_group = self
            .world
            .parent(object)
            .filter(|&p| self.world.is_geo_group(p));

        let group = self.world.spawn_geo_group();
        if !self.world.add_child(group, object) {
            self.world.despawn(group);
            return Err(OverlayError::UnknownEntity(object));
        }
        self.world.add_child(self.world_group, group);
        if let Some(old) = previous_group {
            if self.world.children(old).is_empty() {
                self.world.despawn(old);
            }
        }

        for entity in self.world.subtree(object) {
            if self.world.is_mesh(entity) {
                self.hoverables.insert(entity);
            }
        }
        debug!(%object, %group, lon = coordinate.lon, lat = coordinate.lat, "object added");
        self.move_to_coordinate(object, coordinate, opts)
    }

    /// Moves an already placed object. Fails without side effects when the
    /// object has no geo group.
    pub fn move_to_coordinate(
        &mut self,
        object: EntityId,
        coordinate: Coordinate,
        opts: PlacementOptions,
    ) -> Result<EntityId, OverlayError> {
        placement::place(&mut self.world, object, coordinate, &opts)?;
        Ok(object)
    }

    /// Geo-referenced meshes carry their own coordinates; not supported.
    pub fn add_georeferenced_mesh(
        &mut self,
        mesh: EntityId,
        _opts: PlacementOptions,
    ) -> Result<EntityId, OverlayError> {
        warn!(%mesh, "add_georeferenced_mesh is not implemented");
        Err(OverlayError::Unimplemented("add_georeferenced_mesh"))
    }

    /// Removes a placed object together with its geo group.
    pub fn remove(&mut self, object: EntityId) -> Result<(), OverlayError> {
        if !self.world.contains(object) || object == self.world.root() || object == self.world_group {
            return Err(OverlayError::UnknownEntity(object));
        }
        let target = placement::resolve_geo_group(&self.world, object).unwrap_or(object);
        let removed = self.world.despawn(target);
        self.forget(&removed);
        debug!(%object, removed = removed.len(), "object removed");
        Ok(())
    }

    fn forget(&mut self, removed: &[EntityId]) {
        let gone: EntitySet = removed.iter().copied().collect();
        for &entity in removed {
            self.hoverables.remove(entity);
        }
        for layer in self.layers.iter_mut() {
            layer.retain_entities(|e| !gone.contains(e));
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&SymbolLayer> {
        self.layers.get(id)
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Creates a layer and places one model per point feature of `source`.
    pub fn add_symbol_layer(
        &mut self,
        options: SymbolLayerOptions,
        source: &FeatureCollection,
    ) -> Result<LayerId, OverlayError> {
        let name = options.name.clone();
        let id = self.layers.add(options);
        self.update_layer_source(id, source, false)?;
        info!(layer = %id, name = %name, "symbol layer added");
        Ok(id)
    }

    /// Places or moves the layer's objects to match `source`.
    ///
    /// Features are matched by key. Known keys are moved, new keys get a fresh
    /// model. With `absolute`, keys missing from `source` are removed.
    pub fn update_layer_source(
        &mut self,
        id: LayerId,
        source: &FeatureCollection,
        absolute: bool,
    ) -> Result<(), OverlayError> {
        let Some(layer) = self.layers.get(id) else {
            warn!(layer = %id, "update of an unknown layer");
            return Err(OverlayError::UnknownLayer(id));
        };
        let layer_options = layer.options().clone();
        let placement = layer_options.placement();

        let mut seen = BTreeSet::new();
        let (mut added, mut moved, mut skipped) = (0usize, 0usize, 0usize);
        for (position, feature) in source.features.iter().enumerate() {
            let Some(coordinate) = feature.coordinate() else {
                skipped += 1;
                continue;
            };
            let key = feature.key(layer_options.key_property.as_deref(), position);

            let existing = self
                .layers
                .get(id)
                .and_then(|l| l.feature(&key))
                .filter(|&e| self.world.contains(e));
            match existing {
                Some(entity) => {
                    self.move_to_coordinate(entity, coordinate, placement)?;
                    moved += 1;
                }
                None => {
                    let mesh = self.world.spawn_mesh(layer_options.model.drawable());
                    self.add_at_coordinate(mesh, coordinate, placement)?;
                    if let Some(layer) = self.layers.get_mut(id) {
                        layer.insert_feature(key.clone(), mesh);
                    }
                    added += 1;
                }
            }
            seen.insert(key);
        }

        let mut removed = 0usize;
        if absolute {
            let stale: Vec<String> = self
                .layers
                .get(id)
                .map(|l| {
                    l.features()
                        .filter(|(k, _)| !seen.contains(*k))
                        .map(|(k, _)| k.to_string())
                        .collect()
                })
                .unwrap_or_default();
            for key in stale {
                if self.remove_layer_feature(id, &key)? {
                    removed += 1;
                }
            }
        }
        debug!(layer = %id, added, moved, removed, skipped, "layer source updated");
        Ok(())
    }

    /// Removes one feature's object. Returns `false` if the key is unknown.
    pub fn remove_layer_feature(&mut self, id: LayerId, key: &str) -> Result<bool, OverlayError> {
        let layer = self.layers.get_mut(id).ok_or(OverlayError::UnknownLayer(id))?;
        let Some(entity) = layer.remove_feature(key) else {
            return Ok(false);
        };
        if self.world.contains(entity) {
            self.remove(entity)?;
        }
        Ok(true)
    }

    /// Removes a layer and every object it placed.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<(), OverlayError> {
        let layer = self.layers.remove(id).ok_or(OverlayError::UnknownLayer(id))?;
        for entity in layer.entities() {
            if self.world.contains(entity) {
                self.remove(entity)?;
            }
        }
        info!(layer = %id, name = layer.name(), "symbol layer removed");
        Ok(())
    }

    /// Drops placed objects, layers and pending events. The world group and
    /// the default lights stay.
    pub fn teardown(&mut self) {
        let groups: Vec<EntityId> = self
            .world
            .children(self.world_group)
            .iter()
            .copied()
            .filter(|&e| self.world.is_geo_group(e))
            .collect();
        let mut removed = Vec::new();
        for group in groups {
            removed.extend(self.world.despawn(group));
        }
        self.hoverables.clear();
        self.layers.clear();
        self.hover.clear();
        self.events.clear();
        info!(removed = removed.len(), "overlay torn down");
    }
}

impl<H, B> Overlay<H, B>
where
    H: MapHost + 'static,
    B: RenderBackend + 'static,
{
    /// Registers the frame job and the one-shot that arms hover after the
    /// first frame.
    pub fn schedule(scheduler: &mut Scheduler<Self>) {
        scheduler.add_job(Job::new(FRAME_JOB_ID, |frame, overlay: &mut Self| {
            overlay.frame(frame)
        }));
        scheduler.defer(|overlay: &mut Self| overlay.arm_hover());
    }

    /// Stops the frame loop and tears the overlay down.
    pub fn stop(&mut self, scheduler: &mut Scheduler<Self>) {
        scheduler.stop();
        self.teardown();
    }
}

impl Overlay<MapTransform, gpu::renderer::HeadlessBackend> {
    /// Overlay over a fixed view with a headless backend.
    pub fn headless(view: MapTransform, options: OverlayOptions) -> Self {
        Self::new(view, gpu::renderer::HeadlessBackend::new(), options)
    }
}

fn viewport_px(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{FRAME_JOB_ID, Overlay};
    use crate::config::{HoverComparison, OverlayOptions, PlacementOptions};
    use crate::error::OverlayError;
    use crate::host::{MapEvent, MapTransform};
    use crate::hover::HoverCallbacks;
    use foundation::math::mercator::{project_to_world, units_per_meter};
    use foundation::math::{Coordinate, Vec2, Vec3};
    use gpu::renderer::HeadlessBackend;
    use layers::{FeatureCollection, ModelShape, SymbolLayerOptions};
    use pretty_assertions::assert_eq;
    use runtime::scheduler::Scheduler;
    use scene::EntityId;
    use scene::components::Drawable3D;

    type TestOverlay = Overlay<MapTransform, HeadlessBackend>;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Over(EntityId),
        Out,
    }

    const CENTER: Coordinate = Coordinate {
        lon: 13.4,
        lat: 52.5,
        alt_m: 0.0,
    };

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn view() -> MapTransform {
        MapTransform::from_view(CENTER, 12.0, 0.0, 0.0, 800.0, 600.0)
    }

    fn recording_overlay(options: OverlayOptions) -> (TestOverlay, Rc<RefCell<Vec<Call>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let over_log = Rc::clone(&log);
        let out_log = Rc::clone(&log);
        let overlay = TestOverlay::headless(view(), options).with_hover_callbacks(
            HoverCallbacks::new()
                .on_mesh_over(move |e| over_log.borrow_mut().push(Call::Over(e)))
                .on_mesh_out(move || out_log.borrow_mut().push(Call::Out)),
        );
        (overlay, log)
    }

    fn cube_at_center(overlay: &mut TestOverlay) -> EntityId {
        let mesh = overlay.spawn_mesh(Drawable3D::cube(200.0));
        overlay
            .add_at_coordinate(mesh, CENTER, PlacementOptions::new())
            .expect("placed")
    }

    #[test]
    fn new_syncs_camera_and_sizes_backend() {
        let overlay = TestOverlay::headless(view(), OverlayOptions::default());
        assert_eq!((overlay.backend().width, overlay.backend().height), (800, 600));
        assert_close(overlay.camera().position().z, 900.0, 1e-6);
        assert!(overlay.world().node(overlay.world_group()).and_then(|n| n.matrix).is_some());
        assert_eq!(overlay.world().lights().len(), 2);
        assert!(!overlay.hover().is_armed());
    }

    #[test]
    fn default_lights_can_be_disabled() {
        let options = OverlayOptions {
            default_lights: false,
            ..OverlayOptions::default()
        };
        let overlay = TestOverlay::headless(view(), options);
        assert!(overlay.world().lights().is_empty());
    }

    #[test]
    fn hover_fires_after_arming_and_once_per_change() {
        let (mut overlay, log) = recording_overlay(OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let mut scheduler = Scheduler::new();
        TestOverlay::schedule(&mut scheduler);
        assert_eq!(scheduler.job_count(), 1);

        overlay.notify(MapEvent::PointerMove { x: 400.0, y: 300.0 });
        scheduler.tick(&mut overlay).expect("running");
        assert!(log.borrow().is_empty());
        assert!(overlay.hover().is_armed());
        assert_eq!(overlay.stats().last_hit_count, 1);
        assert_eq!(overlay.hover().active(), &[mesh]);

        // Still over the mesh it was resting on before arming.
        scheduler.tick(&mut overlay);
        scheduler.tick(&mut overlay);
        assert!(log.borrow().is_empty());

        overlay.notify(MapEvent::PointerMove { x: 0.0, y: 0.0 });
        scheduler.tick(&mut overlay);
        scheduler.tick(&mut overlay);
        assert_eq!(*log.borrow(), vec![Call::Out]);

        overlay.notify(MapEvent::PointerMove { x: 400.0, y: 300.0 });
        scheduler.tick(&mut overlay);
        assert_eq!(*log.borrow(), vec![Call::Out, Call::Over(mesh)]);

        let stats = overlay.stats();
        assert_eq!(stats.frames, 6);
        assert_eq!((stats.mesh_over_calls, stats.mesh_out_calls), (1, 1));
        assert_eq!(overlay.backend().frames_rendered, 6);
    }

    #[test]
    fn pointer_events_are_normalized() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        overlay.notify(MapEvent::PointerMove { x: 800.0, y: 0.0 });
        overlay.frame(runtime::frame::Frame::new(0, 1.0 / 60.0));
        assert_eq!(overlay.pointer_ndc(), Vec2::new(1.0, 1.0));
        assert_eq!(overlay.stats().events_applied, 1);
    }

    #[test]
    fn unplaced_meshes_are_not_hoverable() {
        let (mut overlay, log) = recording_overlay(OverlayOptions::default());
        let mesh = overlay.spawn_mesh(Drawable3D::cube(1.0e9));
        let root = overlay.world().root();
        overlay.world_mut().add_child(root, mesh);
        overlay.arm_hover();
        overlay.frame(runtime::frame::Frame::new(0, 1.0 / 60.0));
        assert!(log.borrow().is_empty());
        assert_eq!(overlay.stats().last_hit_count, 0);
    }

    #[test]
    fn identity_comparison_is_configurable() {
        let options = OverlayOptions::default().with_hover_comparison(HoverComparison::Identity);
        let overlay = TestOverlay::headless(view(), options);
        assert_eq!(overlay.hover().comparison(), HoverComparison::Identity);
    }

    #[test]
    fn placement_wraps_projects_and_scales() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let group = overlay.world().parent(mesh).expect("geo group");
        assert!(overlay.world().is_geo_group(group));
        assert_eq!(overlay.world().parent(group), Some(overlay.world_group()));
        assert!(overlay.hoverables().contains(mesh));

        let t = overlay.world().transform(group).expect("transform");
        assert_eq!(t.position, project_to_world(CENTER));
        assert_eq!(t.scale, Vec3::ONE * units_per_meter(CENTER.lat));
        assert_eq!(overlay.world().anchor(mesh).and_then(|a| a.coordinate), Some(CENTER));
    }

    #[test]
    fn moving_twice_to_the_same_place_is_idempotent() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let group = overlay.world().parent(mesh).expect("geo group");
        let to = Coordinate::new(13.5, 52.4, 40.0);
        overlay.move_to_coordinate(mesh, to, PlacementOptions::new()).expect("moved");
        let first = overlay.world().transform(group);
        overlay.move_to_coordinate(mesh, to, PlacementOptions::new()).expect("moved");
        assert_eq!(overlay.world().transform(group), first);
    }

    #[test]
    fn moving_an_unplaced_object_fails_cleanly() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = overlay.spawn_mesh(Drawable3D::cube(1.0));
        let before = overlay.world().node(mesh).cloned();
        let result = overlay.move_to_coordinate(mesh, CENTER, PlacementOptions::new());
        assert_eq!(result, Err(OverlayError::MissingGeoGroup(mesh)));
        assert_eq!(overlay.world().node(mesh).cloned(), before);
    }

    #[test]
    fn invalid_pre_scale_falls_back_to_unit_scale() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let opts: PlacementOptions =
            serde_json::from_str(r#"{"preScale": [2, 2]}"#).expect("lenient options");
        let mesh = overlay.spawn_mesh(Drawable3D::cube(1.0));
        overlay.add_at_coordinate(mesh, CENTER, opts).expect("placed");
        let group = overlay.world().parent(mesh).expect("geo group");
        assert_eq!(
            overlay.world().transform(group).map(|t| t.scale),
            Some(Vec3::ONE * units_per_meter(CENTER.lat))
        );
    }

    #[test]
    fn stored_latitude_preference_is_reused() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = overlay.spawn_mesh(Drawable3D::cube(1.0));
        let no_lat = PlacementOptions::new().with_pre_scale(3.0).with_scale_to_latitude(false);
        overlay.add_at_coordinate(mesh, CENTER, no_lat).expect("placed");
        let unset = PlacementOptions::new().with_pre_scale(3.0);
        overlay
            .move_to_coordinate(mesh, Coordinate::lon_lat(0.0, 60.0), unset)
            .expect("moved");
        let group = overlay.world().parent(mesh).expect("geo group");
        assert_eq!(overlay.world().transform(group).map(|t| t.scale), Some(Vec3::splat(3.0)));
    }

    #[test]
    fn re_adding_replaces_the_old_geo_group() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let old = overlay.world().parent(mesh).expect("geo group");
        overlay
            .add_at_coordinate(mesh, Coordinate::lon_lat(0.0, 0.0), PlacementOptions::new())
            .expect("placed again");
        assert!(!overlay.world().contains(old));
        let groups = overlay
            .world()
            .children(overlay.world_group())
            .iter()
            .filter(|&&e| overlay.world().is_geo_group(e))
            .count();
        assert_eq!(groups, 1);
    }

    #[test]
    fn geo_groups_cannot_be_wrapped_again() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let group = overlay.world().parent(mesh).expect("geo group");
        let before = overlay.world().children(overlay.world_group()).to_vec();

        let result = overlay.add_at_coordinate(group, CENTER, PlacementOptions::new());
        assert_eq!(result, Err(OverlayError::NestedGeoGroup(group)));
        assert_eq!(overlay.world().children(overlay.world_group()).to_vec(), before);
        assert_eq!(overlay.world().parent(group), Some(overlay.world_group()));
    }

    #[test]
    fn remove_drops_group_and_hover_registration() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let mesh = cube_at_center(&mut overlay);
        let group = overlay.world().parent(mesh).expect("geo group");
        overlay.remove(mesh).expect("removed");
        assert!(!overlay.world().contains(mesh));
        assert!(!overlay.world().contains(group));
        assert!(overlay.hoverables().is_empty());
        assert_eq!(overlay.remove(mesh), Err(OverlayError::UnknownEntity(mesh)));
    }

    #[test]
    fn screen_projection_and_georeferenced_meshes_are_unsupported() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        assert_eq!(overlay.project_to_screen(CENTER), None);
        assert_eq!(overlay.unproject_from_screen(Vec2::new(1.0, 2.0)), None);
        let mesh = overlay.spawn_mesh(Drawable3D::cube(1.0));
        assert_eq!(
            overlay.add_georeferenced_mesh(mesh, PlacementOptions::new()),
            Err(OverlayError::Unimplemented("add_georeferenced_mesh"))
        );
        assert!(!overlay.world().is_attached(mesh));
    }

    #[test]
    fn world_projection_round_trips() {
        let overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let c = Coordinate::new(-70.5, -33.4, 120.0);
        let back = overlay.unproject_from_world(overlay.project_to_world(c));
        assert_close(back.lon, c.lon, 1e-9);
        assert_close(back.lat, c.lat, 1e-9);
        assert_close(back.alt_m, c.alt_m, 1e-6);
        assert_close(overlay.units_per_meter(0.0), 512.0 / 40_075_000.0, 1e-18);
    }

    #[test]
    fn resize_and_move_events_resync() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        *overlay.host_mut() = MapTransform::from_view(CENTER, 12.0, 0.0, 0.0, 400.0, 300.0);
        overlay.notify(MapEvent::Resize);
        overlay.frame(runtime::frame::Frame::new(0, 1.0 / 60.0));
        assert_eq!((overlay.backend().width, overlay.backend().height), (400, 300));
        assert_close(overlay.camera().position().z, 450.0, 1e-6);

        let before = overlay.world().node(overlay.world_group()).and_then(|n| n.matrix);
        *overlay.host_mut() = MapTransform::from_view(CENTER, 13.0, 0.0, 0.0, 400.0, 300.0);
        overlay.notify(MapEvent::Move);
        overlay.frame(runtime::frame::Frame::new(1, 1.0 / 60.0));
        let after = overlay.world().node(overlay.world_group()).and_then(|n| n.matrix);
        assert_ne!(before, after);
    }

    #[test]
    fn symbol_layer_lifecycle() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let source = FeatureCollection::points([
            ("a".to_string(), Coordinate::lon_lat(13.40, 52.50)),
            ("b".to_string(), Coordinate::lon_lat(13.41, 52.51)),
            ("c".to_string(), Coordinate::lon_lat(13.42, 52.52)),
        ]);
        let options = SymbolLayerOptions::new("pins").with_model(ModelShape::Sphere { radius: 5.0 });
        let id = overlay.add_symbol_layer(options, &source).expect("layer");
        let layer = overlay.layer(id).expect("registered");
        assert_eq!(layer.len(), 3);
        let a = layer.feature("a").expect("a");
        assert_eq!(overlay.hoverables().len(), 3);

        let update = FeatureCollection::points([
            ("a".to_string(), Coordinate::lon_lat(13.45, 52.55)),
            ("d".to_string(), Coordinate::lon_lat(13.43, 52.53)),
        ]);
        overlay.update_layer_source(id, &update, true).expect("updated");
        let layer = overlay.layer(id).expect("registered");
        let keys: Vec<&str> = layer.features().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "d"]);
        assert_eq!(layer.feature("a"), Some(a));
        assert_eq!(
            overlay.world().anchor(a).and_then(|x| x.coordinate),
            Some(Coordinate::lon_lat(13.45, 52.55))
        );
        assert_eq!(overlay.hoverables().len(), 2);

        assert_eq!(overlay.remove_layer_feature(id, "zzz"), Ok(false));
        overlay.remove_layer(id).expect("removed");
        assert!(overlay.layer(id).is_none());
        assert!(!overlay.world().contains(a));
        assert!(overlay.hoverables().is_empty());
        assert_eq!(overlay.remove_layer(id), Err(OverlayError::UnknownLayer(id)));
    }

    #[test]
    fn relative_update_keeps_missing_features() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let source = FeatureCollection::points([
            ("a".to_string(), Coordinate::lon_lat(1.0, 1.0)),
            ("b".to_string(), Coordinate::lon_lat(2.0, 2.0)),
        ]);
        let id = overlay
            .add_symbol_layer(SymbolLayerOptions::new("pins"), &source)
            .expect("layer");
        let only_a = FeatureCollection::points([("a".to_string(), Coordinate::lon_lat(1.5, 1.5))]);
        overlay.update_layer_source(id, &only_a, false).expect("updated");
        assert_eq!(overlay.layer(id).map(|l| l.len()), Some(2));
    }

    #[test]
    fn removing_a_layer_object_directly_updates_the_layer() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        let source = FeatureCollection::points([("a".to_string(), CENTER)]);
        let id = overlay
            .add_symbol_layer(SymbolLayerOptions::new("pins"), &source)
            .expect("layer");
        let a = overlay.layer(id).and_then(|l| l.feature("a")).expect("a");
        overlay.remove(a).expect("removed");
        assert_eq!(overlay.layer(id).map(|l| l.len()), Some(0));
    }

    #[test]
    fn stop_ends_the_loop_and_clears_the_scene() {
        let mut overlay = TestOverlay::headless(view(), OverlayOptions::default());
        cube_at_center(&mut overlay);
        let mut scheduler = Scheduler::new();
        TestOverlay::schedule(&mut scheduler);
        scheduler.tick(&mut overlay);

        overlay.stop(&mut scheduler);
        assert!(scheduler.tick(&mut overlay).is_none());
        assert_eq!(overlay.backend().frames_rendered, 1);
        assert!(overlay.hoverables().is_empty());
        assert!(overlay.world().meshes().is_empty());
        assert_eq!(overlay.world().lights().len(), 2);
        assert_eq!(scheduler.remove_job(FRAME_JOB_ID), 1);
    }
}
