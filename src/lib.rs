//! Rule-driven RO-Crate metadata generation
//!
//! This library turns a Dataverse dataset JSON document into an RO-Crate
//! metadata document (`@context` + `@graph`), driven entirely by a tabular
//! rule set instead of hardcoded per-field logic.
//!
//! # Overview
//!
//! A build works through a declarative mapping table whose rows each map
//! one location in the dataset JSON to one property of one output entity:
//!
//! 1. The designated root entity ("Metadata") is built from its rule rows
//! 2. `refersTo:` expressions recursively build the contextual entities
//!    they point at (people, organizations, ...) and attach their ids as
//!    `{"@id": ...}` references
//! 3. The dataset's flat file list is expanded into a hierarchy of
//!    Dataset-typed folder entities and File-typed file entities chained
//!    through `hasPart`
//! 4. Everything is merged into one ordered graph with union semantics:
//!    properties accumulate deduplicated values and `@id` is immutable
//!    once assigned
//!
//! # Usage
//!
//! ```ignore
//! use rocrate_mapper::{build, load_dataset, load_rules, to_json_string, BuildOptions};
//!
//! let rules = load_rules("dataverse2ro-crate.csv")?;
//! let dataset = load_dataset("datasetJson.json")?;
//!
//! let result = build(&rules, &dataset, &BuildOptions::default())?;
//! println!("{}", to_json_string(&result, true)?);
//! ```
//!
//! The rule table is read-only and can be shared across builds; each build
//! owns its graph. Rule tables must keep their `refersTo:` chains acyclic;
//! a cycle is reported as [`BuildError::CycleDetected`].

pub mod build;
pub mod builder;
pub mod entity;
pub mod error;
pub mod extract;
pub mod files;
pub mod graph;
pub mod loader;
pub mod path;
pub mod rules;
pub mod vocab;

// Re-export main types for convenience
pub use crate::build::{build, to_json_string, to_jsonld, BuildOptions, BuildResult, BuildStats};
pub use crate::builder::BuildContext;
pub use crate::entity::{Entity, PropertyValue};
pub use crate::error::BuildError;
pub use crate::files::add_file_entities;
pub use crate::graph::EntityGraph;
pub use crate::loader::{load_dataset, load_rules, parse_rules_csv};
pub use crate::rules::{MappingRule, RuleTable, ValueExpression};
pub use crate::vocab::{ROCRATE_CONTEXT, ROOT_RULE_ENTITY};
