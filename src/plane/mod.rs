//! Detected surfaces: the registry of plane anchors and projection onto them

mod projection;
mod registry;

pub use projection::project_onto_horizontal_plane;
pub use registry::PlaneRegistry;
