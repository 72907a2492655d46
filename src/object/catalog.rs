//! Model identities and the catalog of placeable templates

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PlaceableObject;

/// Identity of a loadable model kind.
///
/// `file_name` is the stable key written to the persisted anchor table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub file_name: String,
    pub display_name: String,
}

impl ModelDescriptor {
    /// Descriptor whose display name is the file name
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            display_name: file_name.clone(),
            file_name,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// All placeable templates for the session, keyed by file name.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    by_file_name: HashMap<String, PlaceableObject>,
    descriptors: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    pub fn new(objects: impl IntoIterator<Item = PlaceableObject>) -> Self {
        let by_file_name: HashMap<_, _> = objects
            .into_iter()
            .map(|object| (object.descriptor().file_name.clone(), object))
            .collect();
        let mut descriptors: Vec<_> = by_file_name
            .values()
            .map(|object| object.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Self {
            by_file_name,
            descriptors,
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&PlaceableObject> {
        self.by_file_name.get(file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut PlaceableObject> {
        self.by_file_name.get_mut(file_name)
    }

    /// Descriptors ordered by display name
    pub fn descriptors(&self) -> &[ModelDescriptor] {
        &self.descriptors
    }

    /// First model in display order, selected when a session starts
    pub fn first(&self) -> Option<&ModelDescriptor> {
        self.descriptors.first()
    }

    pub fn len(&self) -> usize {
        self.by_file_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file_name.is_empty()
    }
}
