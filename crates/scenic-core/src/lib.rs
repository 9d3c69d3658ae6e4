pub mod id;
pub mod model;
pub mod registry;

pub use id::ObjectId;
pub use model::*;
pub use registry::{Placement, Registry, TreeError};

// Re-export geometry types so downstream crates agree on one version.
pub use kurbo::{Point, Size, Vec2};
