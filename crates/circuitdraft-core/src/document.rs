//! Circuit document: the ordered set of placed components.

use crate::component::{Component, ComponentId};
use crate::connection;
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Width of a new document when none is given.
pub const DEFAULT_WIDTH: f64 = 640.0;
/// Height of a new document when none is given.
pub const DEFAULT_HEIGHT: f64 = 480.0;

/// A circuit document containing all components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// Canvas size.
    pub size: Size,
    /// All components in the document, keyed by ID.
    components: HashMap<ComponentId, Component>,
    /// Insertion order of components (back to front).
    order: Vec<ComponentId>,
}

impl Default for CircuitDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitDocument {
    /// Create a new empty document with the default size.
    pub fn new() -> Self {
        Self::with_size(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Create a new empty document with the given canvas size.
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            size: Size::new(width, height),
            components: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Append a component to the document.
    pub fn add_component(&mut self, component: Component) {
        let id = component.id();
        self.order.retain(|&c| c != id);
        self.order.push(id);
        self.components.insert(id, component);
    }

    /// Insert a component at a position in the order (clamped to the end).
    pub fn insert_component(&mut self, index: usize, component: Component) {
        let id = component.id();
        self.order.retain(|&c| c != id);
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        self.components.insert(id, component);
    }

    /// Remove a component, returning its former position and value.
    pub fn remove_component(&mut self, id: ComponentId) -> Option<(usize, Component)> {
        let index = self.index_of(id)?;
        self.order.remove(index);
        self.components.remove(&id).map(|c| (index, c))
    }

    /// Get a component by ID.
    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Get a mutable reference to a component by ID.
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(&id)
    }

    /// Check whether a component is part of the document.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    /// Position of a component in the order.
    pub fn index_of(&self, id: ComponentId) -> Option<usize> {
        self.order.iter().position(|&c| c == id)
    }

    /// Component IDs in order.
    pub fn ids(&self) -> &[ComponentId] {
        &self.order
    }

    /// Components in order (back to front).
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|id| self.components.get(id))
    }

    /// Remove every component.
    pub fn clear(&mut self) {
        self.components.clear();
        self.order.clear();
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Get the bounding box of all components.
    pub fn bounds(&self) -> Option<Rect> {
        self.components()
            .map(Component::bounds)
            .reduce(|a, b| a.union(b))
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON and rebuild its connections.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_str(json)?;
        // Drop order entries without a component, and duplicates.
        let components = &doc.components;
        let mut seen = HashSet::new();
        doc.order.retain(|id| components.contains_key(id) && seen.insert(*id));
        // Components missing from the order go on top, sorted for a stable result.
        let mut missing: Vec<ComponentId> = components
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        missing.sort();
        doc.order.extend(missing);
        connection::resolve_all(&mut doc);
        Ok(doc)
    }
}
