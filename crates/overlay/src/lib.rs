//! 3D meshes on a slippy map.
//!
//! [`Overlay`] keeps a perspective camera in step with the map's view,
//! places meshes at geographic coordinates, and reports pointer hover over
//! placed meshes. The map itself and the rasterizer are reached through the
//! [`MapHost`] and [`gpu::RenderBackend`] traits.

pub mod camera_sync;
pub mod config;
pub mod error;
pub mod host;
pub mod hover;
pub mod overlay;
pub mod placement;

pub use camera_sync::*;
pub use config::*;
pub use error::*;
pub use host::*;
pub use hover::*;
pub use overlay::*;

pub use layers::{
    FeatureCollection, LayerId, ModelShape, PlacementOptions, PreScale, SymbolLayer,
    SymbolLayerOptions,
};
