//! The entity graph: ordered registry of entities and merge semantics
//!
//! Entities are keyed by `@id` in first-registration order, which is also
//! the order of the final `@graph` array. Entities only ever grow: an
//! upsert copies missing properties verbatim and appends values (with
//! dedupe) to existing ones, never overwriting `@id` and never clearing a
//! reference flag already set.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::entity::Entity;
use crate::error::BuildError;
use crate::vocab::ROCRATE_CONTEXT;

#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: IndexMap<String, Entity>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.entities.keys()
    }

    /// Return the entity registered under `id`, creating and registering
    /// an empty one (with its `@id` set) if absent
    pub fn get_or_create(&mut self, id: &str) -> &mut Entity {
        let entity = self.entities.entry(id.to_string()).or_default();
        entity.set_literal("@id", id);
        entity
    }

    /// Register (or replace) an entity under an id directly
    pub fn put(&mut self, id: &str, entity: Entity) {
        self.entities.insert(id.to_string(), entity);
    }

    /// Merge a finished entity into the graph under its own `@id`
    pub fn upsert(&mut self, entity: &Entity) -> Result<(), BuildError> {
        let id = entity.id().ok_or(BuildError::MissingEntityId)?.to_string();
        self.get_or_create(&id).merge_from(entity);
        Ok(())
    }

    /// Render the full JSON-LD document
    pub fn render(&self) -> Value {
        let graph: Vec<Value> = self.entities.values().map(Entity::render).collect();
        json!({
            "@context": ROCRATE_CONTEXT,
            "@graph": graph,
        })
    }
}
