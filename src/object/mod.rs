//! Placeable templates, placed instances and the model catalog

mod catalog;
mod placeable;
mod placed;

pub use catalog::{ModelCatalog, ModelDescriptor};
pub use placeable::{PlaceableObject, RenderContent};
pub use placed::{Lifecycle, ObjectId, PlacedObject};
