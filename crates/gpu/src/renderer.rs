use foundation::math::Mat4;
use scene::components::{Light, Shape3D};
use scene::entity::EntityId;
use scene::world::World;
use tracing::debug;

use crate::camera::PerspectiveCamera;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    DrawMesh {
        entity: EntityId,
        model: Mat4,
        shape: Shape3D,
    },
    Light {
        entity: EntityId,
        model: Mat4,
        light: Light,
    },
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub view: Mat4,
    pub projection: Mat4,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn mesh_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawMesh { .. }))
            .count()
    }
}

/// The rasterizer behind the overlay (a WebGL/wgpu renderer in practice).
pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32);
    fn render(&mut self, frame: &RenderFrame);
}

pub struct Renderer;

impl Renderer {
    /// Extracts draw commands for every visible node reachable from the root.
    /// Lights come first so a backend can bind them before drawing meshes.
    pub fn collect(world: &World, camera: &PerspectiveCamera) -> RenderFrame {
        let mut commands = Vec::new();
        for (entity, model, light) in world.lights() {
            commands.push(RenderCommand::Light {
                entity,
                model,
                light,
            });
        }
        for (entity, model, drawable) in world.meshes() {
            commands.push(RenderCommand::DrawMesh {
                entity,
                model,
                shape: drawable.shape,
            });
        }
        RenderFrame {
            view: camera.view(),
            projection: camera.projection,
            commands,
        }
    }
}

/// Backend that draws nothing and keeps counters, for headless runs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeadlessBackend {
    pub width: u32,
    pub height: u32,
    pub frames_rendered: u64,
    pub last_frame: Option<RenderFrame>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for HeadlessBackend {
    fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "headless backend resized");
        self.width = width;
        self.height = height;
    }

    fn render(&mut self, frame: &RenderFrame) {
        self.frames_rendered += 1;
        self.last_frame = Some(frame.clone());
    }
}
