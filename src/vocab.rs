//! Well-known identifiers and type names for the generated RO-Crate

/// The @context of every generated crate
pub const ROCRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";

/// Root data entity ID
pub const ROOT_ENTITY_ID: &str = "./";

/// @type given to synthesized folder entities
pub const DATASET_TYPE: &str = "Dataset";

/// @type given to synthesized file entities
pub const FILE_TYPE: &str = "File";

/// Property linking a folder to its children
pub const HAS_PART: &str = "hasPart";

/// Rule-table entity name the build starts from
pub const ROOT_RULE_ENTITY: &str = "Metadata";

/// Rule-table entity names handled by the root entity builder
pub const ROOT_ENTITY_NAMES: [&str; 2] = ["Root", "Metadata"];

/// Prefix marking a value expression as a cross-entity reference
pub const REFERS_TO_PREFIX: &str = "refersTo:";
