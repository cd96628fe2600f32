//! Canvas Schema Types
//!
//! This module defines the component tree of a page: an ordered list of
//! component instances. Position in the list is the display order; no other
//! field is authoritative for ordering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Property bag of a component instance
pub type Props = Map<String, Value>;

/// One placed block on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Stable instance identity (not position)
    pub id: String,

    /// Template key, resolved only by the rendering side
    #[serde(rename = "type")]
    pub component_type: String,

    /// Template properties
    #[serde(default)]
    pub props: Props,
}

impl ComponentInstance {
    /// Create an instance with an empty property bag
    #[must_use]
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            props: Props::new(),
        }
    }

    /// Set the initial property bag
    #[must_use]
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Get a string property
    #[must_use]
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Get a boolean property
    #[must_use]
    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        self.props.get(key).and_then(Value::as_bool)
    }
}

/// Ordered sequence of component instances with unique ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ComponentInstance>", into = "Vec<ComponentInstance>")]
pub struct Schema {
    instances: Vec<ComponentInstance>,
}

// Decoded lists go through `push` so duplicated ids never get in
impl From<Vec<ComponentInstance>> for Schema {
    fn from(instances: Vec<ComponentInstance>) -> Self {
        Self::from_instances(instances)
    }
}

impl From<Schema> for Vec<ComponentInstance> {
    fn from(schema: Schema) -> Self {
        schema.instances
    }
}

impl Schema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from instances, keeping the first occurrence of a duplicated id
    #[must_use]
    pub fn from_instances(instances: impl IntoIterator<Item = ComponentInstance>) -> Self {
        let mut schema = Self::new();
        for instance in instances {
            schema.push(instance);
        }
        schema
    }

    /// Number of instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the canvas has no components
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterate instances in display order
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentInstance> {
        self.instances.iter()
    }

    /// Instances as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[ComponentInstance] {
        &self.instances
    }

    /// Instance ids in display order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.instances.iter().map(|c| c.id.clone()).collect()
    }

    /// Whether an instance with this id exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Index of an instance
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.instances.iter().position(|c| c.id == id)
    }

    /// Get an instance by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ComponentInstance> {
        self.instances.iter().find(|c| c.id == id)
    }

    /// Get a mutable instance by id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ComponentInstance> {
        self.instances.iter_mut().find(|c| c.id == id)
    }

    /// Append an instance. Returns false if the id is already taken.
    pub fn push(&mut self, instance: ComponentInstance) -> bool {
        if self.contains(&instance.id) {
            warn!(instance_id = %instance.id, "Duplicate instance id rejected");
            return false;
        }
        self.instances.push(instance);
        true
    }

    /// Remove an instance by id
    pub fn remove(&mut self, id: &str) -> Option<ComponentInstance> {
        let pos = self.position(id)?;
        Some(self.instances.remove(pos))
    }

    /// Set one property of an instance
    pub fn set_prop(&mut self, id: &str, key: impl Into<String>, value: Value) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.props.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    /// Merge several properties into an instance
    pub fn merge_props(&mut self, id: &str, props: Props) -> bool {
        match self.get_mut(id) {
            Some(instance) => {
                instance.props.extend(props);
                true
            }
            None => false,
        }
    }

    /// Move an instance to `index` (clamped to the end)
    pub fn move_to(&mut self, id: &str, index: usize) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let instance = self.instances.remove(pos);
        let index = index.min(self.instances.len());
        self.instances.insert(index, instance);
        pos != index
    }

    /// Rebuild the order from a list of ids.
    ///
    /// Instances named by `ids` come first, in that order; ids that are unknown
    /// or repeated are skipped. Instances missing from `ids` are appended after
    /// them in their prior relative order, so no component is ever dropped.
    /// Returns whether the order changed.
    pub fn reorder_by_ids(&mut self, ids: &[String]) -> bool {
        let before = self.ids();
        let mut by_id: HashMap<String, ComponentInstance> = self
            .instances
            .drain(..)
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut reordered = Vec::with_capacity(before.len());
        for id in ids {
            if let Some(instance) = by_id.remove(id) {
                reordered.push(instance);
            }
        }
        for id in &before {
            if let Some(instance) = by_id.remove(id) {
                reordered.push(instance);
            }
        }

        self.instances = reordered;
        self.instances.iter().map(|c| &c.id).ne(before.iter())
    }

    /// Remove every instance
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Storage form with a redundant `order` field derived from position
    #[must_use]
    pub fn to_stored(&self) -> Vec<StoredComponent> {
        self.instances
            .iter()
            .enumerate()
            .map(|(order, c)| StoredComponent {
                instance: c.clone(),
                order,
            })
            .collect()
    }

    /// Rebuild from storage. Array position wins over any stored `order`.
    #[must_use]
    pub fn from_stored(stored: Vec<StoredComponent>) -> Self {
        Self::from_instances(stored.into_iter().map(|s| s.instance))
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ComponentInstance;
    type IntoIter = std::slice::Iter<'a, ComponentInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

/// Component as persisted by the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredComponent {
    /// The instance itself
    #[serde(flatten)]
    pub instance: ComponentInstance,
    /// Display position, always equal to the array index when written
    #[serde(default)]
    pub order: usize,
}

/// At most one selected instance id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(Option<String>);

impl Selection {
    /// No selection
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    /// Currently selected id
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether `id` is the selected instance
    #[must_use]
    pub fn is(&self, id: &str) -> bool {
        self.0.as_deref() == Some(id)
    }

    /// Select `id` if it exists in `schema`. Returns whether the selection changed.
    pub fn select(&mut self, schema: &Schema, id: &str) -> bool {
        if !schema.contains(id) || self.is(id) {
            return false;
        }
        self.0 = Some(id.to_string());
        true
    }

    /// Clear the selection. Returns whether something was selected.
    pub fn clear(&mut self) -> bool {
        self.0.take().is_some()
    }

    /// Drop a selection whose id is no longer in `schema`
    pub fn retain_valid(&mut self, schema: &Schema) -> bool {
        match &self.0 {
            Some(id) if !schema.contains(id) => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }

    /// Build a selection from a wire value, validated against `schema`
    #[must_use]
    pub fn from_wire(id: Option<String>, schema: &Schema) -> Self {
        Self(id.filter(|id| schema.contains(id)))
    }

    /// Wire value
    #[must_use]
    pub fn to_wire(&self) -> Option<String> {
        self.0.clone()
    }
}
