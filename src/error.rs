//! Error types for rule-driven crate building

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No mapping rules defined for entity '{0}'")]
    NoRules(String),

    #[error("No '@id' rule defined for entity '{0}'")]
    MissingIdField(String),

    #[error("Failed to extract '{path}': {reason}")]
    Extraction { path: String, reason: String },

    #[error("Cycle detected: entity '{0}' refers back to itself through its refersTo chain")]
    CycleDetected(String),

    #[error("Entity has no '@id' value, cannot merge it into the graph")]
    MissingEntityId,

    #[error("Malformed rule table: {0}")]
    InvalidRules(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
