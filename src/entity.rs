//! Graph entities and their property values
//!
//! An entity is an ordered map from property name to an ordered,
//! duplicate-free list of string values. A property may be marked as a
//! reference, in which case every value renders as an `{"@id": ...}`
//! object instead of a bare string.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Ordered, duplicate-free values of one entity property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyValue {
    values: Vec<String>,
    is_reference: bool,
}

impl PropertyValue {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a value, ignoring empties and duplicates
    pub fn add(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() && !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    /// Append several values with the same dedupe rule
    pub fn merge<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.add(value);
        }
    }

    /// Mark this property as holding entity references.
    /// The flag is sticky: once set it survives later merges.
    pub fn mark_reference(&mut self) {
        self.is_reference = true;
    }

    /// Fold another property value into this one (values + sticky flag)
    pub fn merge_from(&mut self, other: &PropertyValue) {
        self.merge(other.values.iter().cloned());
        self.is_reference |= other.is_reference;
    }

    fn render_one(&self, value: &str) -> Value {
        if self.is_reference {
            json!({ "@id": value })
        } else {
            Value::String(value.to_string())
        }
    }

    /// Render as bare value (one entry) or array (several)
    pub fn render(&self) -> Option<Value> {
        match self.values.len() {
            0 => None,
            1 => Some(self.render_one(&self.values[0])),
            _ => Some(Value::Array(
                self.values.iter().map(|v| self.render_one(v)).collect(),
            )),
        }
    }
}

/// One node of the output graph: an ordered property map
#[derive(Debug, Clone, Default)]
pub struct Entity {
    properties: IndexMap<String, PropertyValue>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties.iter()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Get or insert the named property, preserving insertion order
    pub fn property_mut(&mut self, name: &str) -> &mut PropertyValue {
        self.properties.entry(name.to_string()).or_default()
    }

    /// The sole value of `@id`, if assigned
    pub fn id(&self) -> Option<&str> {
        self.properties
            .get("@id")
            .and_then(|p| p.values().first())
            .map(String::as_str)
    }

    pub fn set_literal(&mut self, name: &str, value: impl Into<String>) {
        self.property_mut(name).add(value);
    }

    /// Attach reference-marked values to a property
    pub fn set_references<I, S>(&mut self, name: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let property = self.property_mut(name);
        property.merge(ids);
        property.mark_reference();
    }

    /// Merge another entity's properties into this one.
    ///
    /// Missing properties are copied verbatim; existing ones accumulate
    /// values with dedupe. `@id`, once present, is never touched.
    pub fn merge_from(&mut self, other: &Entity) {
        for (name, incoming) in &other.properties {
            match self.properties.get_mut(name) {
                None => {
                    self.properties.insert(name.clone(), incoming.clone());
                }
                Some(existing) => {
                    if name != "@id" {
                        existing.merge_from(incoming);
                    }
                }
            }
        }
    }

    /// Render as a JSON object, omitting empty properties
    pub fn render(&self) -> Value {
        let mut out = Map::new();
        for (name, property) in &self.properties {
            if let Some(rendered) = property.render() {
                out.insert(name.clone(), rendered);
            }
        }
        Value::Object(out)
    }
}
