pub mod layer;
pub mod options;
pub mod registry;
pub mod source;
pub mod symbol;

pub use layer::*;
pub use options::*;
pub use registry::*;
pub use source::*;
pub use symbol::*;
