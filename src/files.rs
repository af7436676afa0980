//! File and folder entity synthesis
//!
//! Walks the dataset's flat file list and synthesizes one Dataset-typed
//! folder entity per directory path prefix plus one File-typed entity per
//! file, chained together through order-preserving `hasPart` lists. The
//! accumulated entities are merged into the graph with the same
//! append-dedupe semantics as any other upsert.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::entity::Entity;
use crate::error::BuildError;
use crate::graph::EntityGraph;
use crate::vocab::{DATASET_TYPE, FILE_TYPE, HAS_PART, ROOT_ENTITY_ID};

/// Synthesize file and folder entities from `datasetVersion.files` and
/// merge them into the graph. A dataset without a file list contributes
/// nothing. Returns the number of synthesized entities.
pub fn add_file_entities(doc: &Value, graph: &mut EntityGraph) -> Result<usize, BuildError> {
    let files = doc
        .pointer("/datasetVersion/files")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    // Memoized by id so shared path prefixes reuse one folder entity
    let mut entities: IndexMap<String, Entity> = IndexMap::new();

    for file in &files {
        let Some(label) = file.get("label").and_then(Value::as_str) else {
            debug!("file record without a label, skipped");
            continue;
        };
        let directory = file
            .get("directoryLabel")
            .and_then(Value::as_str)
            .unwrap_or("");

        // Walk the directory path, linking each prefix folder to the next.
        // Trailing slashes carry no path component and are dropped.
        let directory = directory.trim_end_matches('/');
        let mut folder_id = ROOT_ENTITY_ID.to_string();
        if !directory.trim().is_empty() {
            for element in directory.split('/') {
                let folder = folder_entry(&mut entities, &folder_id);
                folder.property_mut(HAS_PART).add(format!("{element}/"));
                folder_id = format!("{element}/");
            }
        }

        let folder = folder_entry(&mut entities, &folder_id);
        folder.property_mut(HAS_PART).add(label);

        entities.entry(label.to_string()).or_insert_with(|| {
            let mut entity = Entity::new();
            entity.set_literal("@id", label);
            entity.set_literal("@type", FILE_TYPE);
            entity
        });
    }

    let count = entities.len();
    for entity in entities.values() {
        graph.upsert(entity)?;
    }
    Ok(count)
}

fn folder_entry<'m>(entities: &'m mut IndexMap<String, Entity>, id: &str) -> &'m mut Entity {
    entities.entry(id.to_string()).or_insert_with(|| {
        let mut entity = Entity::new();
        entity.set_literal("@id", id);
        entity.set_literal("@type", DATASET_TYPE);
        entity
    })
}
