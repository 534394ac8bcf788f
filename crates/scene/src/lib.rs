pub mod components;
pub mod entity;
pub mod entity_set;
pub mod picking;
pub mod world;

pub use entity::*;
pub use entity_set::*;
pub use world::*;
