//! Top-level build orchestration
//!
//! One dataset document in, one RO-Crate JSON-LD document out: build the
//! designated root entity (recursing through contextual entities and
//! reference resolution), synthesize the file tree, render the graph.

use serde_json::Value;

use crate::builder::BuildContext;
use crate::error::BuildError;
use crate::files::add_file_entities;
use crate::graph::EntityGraph;
use crate::rules::RuleTable;
use crate::vocab::ROOT_RULE_ENTITY;

/// Options for a build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Rule-table entity name the build starts from
    pub root_entity: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root_entity: ROOT_RULE_ENTITY.to_string(),
        }
    }
}

/// Result of a build
#[derive(Debug)]
pub struct BuildResult {
    /// The populated entity graph
    pub graph: EntityGraph,
    /// Statistics about the build
    pub stats: BuildStats,
}

/// Statistics from a build
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    /// Entities in the final graph
    pub entities: usize,
    /// File and folder entities synthesized from the file list
    pub file_entities: usize,
    /// Reference ids attached through `refersTo:` expressions
    pub references_resolved: usize,
}

/// Build the crate graph for one dataset document.
///
/// The build is atomic: any error leaves no partial result behind. The
/// rule table is read-only and may be shared across builds; the graph is
/// owned by this build alone.
pub fn build(
    rules: &RuleTable,
    dataset: &Value,
    options: &BuildOptions,
) -> Result<BuildResult, BuildError> {
    let mut ctx = BuildContext::new(rules);
    ctx.add_entity(dataset, &options.root_entity)?;

    let file_entities = add_file_entities(dataset, &mut ctx.graph)?;

    let stats = BuildStats {
        entities: ctx.graph.len(),
        file_entities,
        references_resolved: ctx.references_resolved,
    };
    Ok(BuildResult {
        graph: ctx.graph,
        stats,
    })
}

/// Render a build result as the final JSON-LD document
pub fn to_jsonld(result: &BuildResult) -> Value {
    result.graph.render()
}

/// Serialize a build result to a JSON string
pub fn to_json_string(result: &BuildResult, pretty: bool) -> Result<String, BuildError> {
    let doc = to_jsonld(result);
    if pretty {
        Ok(serde_json::to_string_pretty(&doc)?)
    } else {
        Ok(serde_json::to_string(&doc)?)
    }
}
