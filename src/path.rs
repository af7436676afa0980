//! Query-path construction over the dataset document
//!
//! Turns a rule row's (source location, field name) pair into a concrete
//! path of typed steps. Metadata blocks get special treatment: their field
//! entries are `{typeName, value}` pairs, so selecting a field there means
//! filtering on `typeName` and projecting `value` rather than a plain
//! nested lookup.

use std::fmt;

/// A single step of a query path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Descend into a named field
    Field(String),
    /// Keep array entries whose `typeName` equals the name, project their `value`
    TypeNameFilter(String),
}

/// A concrete query path over the source document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPath {
    steps: Vec<PathStep>,
}

impl QueryPath {
    /// The whole-document path ("$")
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build the path for a rule row's (source, field) pair.
    ///
    /// Blank source and field denote the document root. A slash-separated
    /// source becomes nested field steps. Inside a metadata block the path
    /// is extended with `.fields` and, when a field is named, a
    /// typeName filter projecting the matched entries' `value`.
    pub fn resolve(source: &str, field: &str) -> Self {
        let source = source.trim();
        let field = field.trim();
        if source.is_empty() && field.is_empty() {
            return Self::root();
        }

        let mut steps: Vec<PathStep> = source
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| PathStep::Field(s.to_string()))
            .collect();

        let in_block = source.contains("metadataBlocks");
        let at_fields = source.ends_with("fields");

        if in_block && !at_fields {
            steps.push(PathStep::Field("fields".to_string()));
            if !field.is_empty() {
                steps.push(PathStep::TypeNameFilter(field.to_string()));
            }
        } else if !field.is_empty() {
            steps.push(PathStep::Field(field.to_string()));
        }

        Self { steps }
    }

    /// Like [`QueryPath::resolve`], with one more typeName filter appended
    /// when the path targets a metadata block and `value_from` is given.
    /// Reaches one level deeper into compound fields.
    pub fn resolve_with_value_from(source: &str, field: &str, value_from: &str) -> Self {
        let mut path = Self::resolve(source, field);
        let value_from = value_from.trim();
        if path.targets_metadata_block() && !value_from.is_empty() {
            path.steps
                .push(PathStep::TypeNameFilter(value_from.to_string()));
        }
        path
    }

    fn targets_metadata_block(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, PathStep::Field(name) if name == "metadataBlocks"))
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => write!(f, ".{}", name)?,
                PathStep::TypeNameFilter(name) => {
                    write!(f, "[?(@.typeName=='{}')].value", name)?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_source_and_field_is_root() {
        let path = QueryPath::resolve("", "");
        assert!(path.is_root());
        assert_eq!(path.to_string(), "$");
    }

    #[test]
    fn test_plain_nested_field() {
        let path = QueryPath::resolve("datasetVersion", "versionNumber");
        assert_eq!(
            path.steps(),
            &[
                PathStep::Field("datasetVersion".to_string()),
                PathStep::Field("versionNumber".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "$.datasetVersion.versionNumber");
    }

    #[test]
    fn test_metadata_block_appends_fields_and_filter() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "title");
        assert_eq!(
            path.steps(),
            &[
                PathStep::Field("datasetVersion".to_string()),
                PathStep::Field("metadataBlocks".to_string()),
                PathStep::Field("citation".to_string()),
                PathStep::Field("fields".to_string()),
                PathStep::TypeNameFilter("title".to_string()),
            ]
        );
        assert_eq!(
            path.to_string(),
            "$.datasetVersion.metadataBlocks.citation.fields[?(@.typeName=='title')].value"
        );
    }

    #[test]
    fn test_metadata_block_without_field() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "");
        assert_eq!(
            path.steps().last(),
            Some(&PathStep::Field("fields".to_string()))
        );
    }

    #[test]
    fn test_source_already_at_fields_appends_plain() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation/fields", "title");
        assert_eq!(
            path.steps().last(),
            Some(&PathStep::Field("title".to_string()))
        );
    }

    #[test]
    fn test_value_from_adds_second_filter() {
        let path = QueryPath::resolve_with_value_from(
            "datasetVersion/metadataBlocks/citation",
            "author",
            "authorName",
        );
        assert_eq!(
            path.steps().last(),
            Some(&PathStep::TypeNameFilter("authorName".to_string()))
        );
    }

    #[test]
    fn test_value_from_ignored_outside_metadata_block() {
        let path = QueryPath::resolve_with_value_from("datasetVersion", "files", "label");
        assert_eq!(
            path.steps(),
            QueryPath::resolve("datasetVersion", "files").steps()
        );
    }
}
