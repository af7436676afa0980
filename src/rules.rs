//! Mapping rule table and the value-cell micro-syntax
//!
//! A rule table is an ordered list of rows, grouped by target entity name.
//! Each row maps a location in the source dataset JSON to one property of
//! one output entity. The `value` cell carries a small expression language:
//! empty, a quoted literal, a bare field name, or a `refersTo:` indirection.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::vocab::REFERS_TO_PREFIX;

/// One row of the mapping rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Output entity this row contributes to (rows per entity are contiguous)
    pub entity: String,
    /// Source location, slash-separated (e.g. "datasetVersion/metadataBlocks/citation")
    pub source: String,
    /// Field to select within the source location
    pub source_field: String,
    /// Output property name (`@id` is special)
    pub target_property: String,
    /// Raw value expression (may hold several comma-separated candidates)
    pub value: String,
}

impl MappingRule {
    /// Parse the value cell as a single expression
    pub fn expression(&self) -> ValueExpression {
        ValueExpression::parse(&self.value)
    }

    /// Split the value cell into candidate expressions, tried in order
    pub fn candidates(&self) -> Vec<ValueExpression> {
        self.value
            .split(',')
            .map(|c| ValueExpression::parse(c))
            .collect()
    }
}

/// Parsed form of a rule's value cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpression {
    /// Blank cell
    Empty,
    /// Quoted literal, quote characters stripped
    Literal(String),
    /// Bare field or subfield name used as an extraction key
    Field(String),
    /// `refersTo:` indirection to another entity
    RefersTo(RefTarget),
}

/// Target of a `refersTo:` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// `refersTo:"some-id"`: the literal is the referenced id itself
    Literal(String),
    /// `refersTo:EntityName`: build the named entity and take its id(s)
    Entity(String),
}

impl ValueExpression {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ValueExpression::Empty;
        }
        if trimmed.contains(REFERS_TO_PREFIX) {
            let target = trimmed.replacen(REFERS_TO_PREFIX, "", 1);
            let target = target.trim();
            return if is_quoted(target) {
                ValueExpression::RefersTo(RefTarget::Literal(strip_quotes(target)))
            } else {
                ValueExpression::RefersTo(RefTarget::Entity(target.to_string()))
            };
        }
        if is_quoted(trimmed) {
            ValueExpression::Literal(strip_quotes(trimmed))
        } else {
            ValueExpression::Field(trimmed.to_string())
        }
    }
}

/// Check whether a cell is wrapped in single or double quotes
fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
}

/// Remove every quote character and surrounding whitespace.
/// Single and double quotes normalize to the same literal.
pub fn strip_quotes(s: &str) -> String {
    s.replace(['"', '\''], "").trim().to_string()
}

/// Immutable, ordered rule set grouped by target entity name
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<MappingRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    /// All rows, in table order
    pub fn rows(&self) -> &[MappingRule] {
        &self.rules
    }

    /// All rows for one entity, in declared order
    pub fn rules_for(&self, entity: &str) -> Result<Vec<&MappingRule>, BuildError> {
        let rows: Vec<&MappingRule> = self
            .rules
            .iter()
            .filter(|r| r.entity == entity)
            .collect();
        if rows.is_empty() {
            return Err(BuildError::NoRules(entity.to_string()));
        }
        Ok(rows)
    }

    /// The value expression of the entity's `@id` row.
    ///
    /// Used when a reference has to be read from an already-extracted field
    /// instead of re-extracted from the document.
    pub fn id_field_label(&self, entity: &str) -> Result<&str, BuildError> {
        self.rules
            .iter()
            .find(|r| r.entity == entity && r.target_property == "@id")
            .map(|r| r.value.as_str())
            .ok_or_else(|| BuildError::MissingIdField(entity.to_string()))
    }
}
