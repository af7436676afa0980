//! Value extraction from the dataset document
//!
//! Executes a [`QueryPath`] against the parsed dataset JSON and classifies
//! the result into one of three shapes the builders dispatch on. Dataverse
//! metadata wraps most values in `{typeName, value}` entries and is fond of
//! single-element arrays, so extraction repeatedly unwraps singleton
//! sequences before handing the result back.

use serde_json::{Map, Value};

use crate::error::BuildError;
use crate::path::{PathStep, QueryPath};

/// Shape of an extracted value, driving the builder's dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A single scalar, stringified
    Scalar(String),
    /// A JSON object
    Object(Map<String, Value>),
    /// A JSON array
    Sequence(Vec<Value>),
}

/// Classify a JSON value.
///
/// Strings, numbers and booleans are scalars; null has no usable shape
/// and yields `None`, which callers treat as a lenient skip.
pub fn classify(value: &Value) -> Option<Shape> {
    match value {
        Value::Object(map) => Some(Shape::Object(map.clone())),
        Value::Array(arr) => Some(Shape::Sequence(arr.clone())),
        _ => scalar_string(value).map(Shape::Scalar),
    }
}

/// Render a scalar JSON value as a string, `None` for non-scalars
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Unwrap one `{"value": ...}` wrapper level, if present
pub fn unwrap_value_field(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("value") => {
            map.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Execute a query path against the document.
///
/// A document without a top-level `datasetVersion` key is a sub-object
/// handed in during recursive reference resolution; for those the requested
/// path is ignored and the whole document is the result. The raw query
/// result is then reduced by unwrapping single-element arrays until the
/// value is no longer a singleton sequence.
pub fn extract(doc: &Value, path: &QueryPath) -> Result<Value, BuildError> {
    let root = QueryPath::root();
    let path = if is_sub_document(doc) { &root } else { path };

    let mut current = doc.clone();
    for step in path.steps() {
        current = apply_step(current, step, path)?;
    }

    loop {
        match current {
            Value::Array(ref arr) if arr.len() == 1 => current = arr[0].clone(),
            _ => break,
        }
    }
    Ok(current)
}

/// A sub-document is anything but a full dataset JSON object
fn is_sub_document(doc: &Value) -> bool {
    match doc.as_object() {
        Some(obj) => !obj.contains_key("datasetVersion"),
        None => true,
    }
}

fn apply_step(current: Value, step: &PathStep, path: &QueryPath) -> Result<Value, BuildError> {
    match step {
        PathStep::Field(name) => match current {
            Value::Object(mut map) => map.remove(name).ok_or_else(|| BuildError::Extraction {
                path: path.to_string(),
                reason: format!("field '{}' not found", name),
            }),
            Value::Array(arr) => {
                // Project the field across elements, dropping those without it
                let projected: Vec<Value> = arr
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Object(mut map) => map.remove(name),
                        _ => None,
                    })
                    .collect();
                Ok(Value::Array(projected))
            }
            _ => Err(BuildError::Extraction {
                path: path.to_string(),
                reason: format!("cannot descend into '{}' on a scalar", name),
            }),
        },
        PathStep::TypeNameFilter(name) => Ok(Value::Array(filter_by_type_name(current, name))),
    }
}

/// Keep entries whose `typeName` matches, projecting their `value`.
/// One level of nested arrays is flattened into the scan.
fn filter_by_type_name(current: Value, name: &str) -> Vec<Value> {
    let mut out = Vec::new();
    match current {
        Value::Array(arr) => {
            for item in arr {
                match item {
                    Value::Array(inner) => {
                        for nested in inner {
                            push_type_name_match(nested, name, &mut out);
                        }
                    }
                    other => push_type_name_match(other, name, &mut out),
                }
            }
        }
        other => push_type_name_match(other, name, &mut out),
    }
    out
}

fn push_type_name_match(value: Value, name: &str, out: &mut Vec<Value>) {
    if let Value::Object(mut map) = value {
        if map.get("typeName").and_then(Value::as_str) == Some(name) {
            out.push(map.remove("value").unwrap_or(Value::Null));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_dataset() -> Value {
        json!({
            "datasetVersion": {
                "versionNumber": 3,
                "metadataBlocks": {
                    "citation": {
                        "fields": [
                            {"typeName": "title", "value": "Sample Study"},
                            {"typeName": "subject", "value": ["Medicine", "Biology"]},
                            {
                                "typeName": "author",
                                "value": [
                                    {"authorName": {"typeName": "authorName", "value": "Doe, Jane"}},
                                    {"authorName": {"typeName": "authorName", "value": "Roe, Richard"}}
                                ]
                            }
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_extract_scalar_through_filter() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "title");
        let value = extract(&sample_dataset(), &path).unwrap();
        // Singleton filter result is unwrapped to the bare scalar
        assert_eq!(value, json!("Sample Study"));
    }

    #[test]
    fn test_extract_multi_valued_field() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "subject");
        let value = extract(&sample_dataset(), &path).unwrap();
        assert_eq!(value, json!(["Medicine", "Biology"]));
    }

    #[test]
    fn test_extract_compound_field() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "author");
        let value = extract(&sample_dataset(), &path).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert!(arr[0].get("authorName").is_some());
    }

    #[test]
    fn test_extract_plain_nested_field() {
        let path = QueryPath::resolve("datasetVersion", "versionNumber");
        let value = extract(&sample_dataset(), &path).unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_extract_missing_field_is_error() {
        let path = QueryPath::resolve("datasetVersion", "nope");
        assert!(matches!(
            extract(&sample_dataset(), &path),
            Err(BuildError::Extraction { .. })
        ));
    }

    #[test]
    fn test_extract_unmatched_filter_is_empty_sequence() {
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "nope");
        let value = extract(&sample_dataset(), &path).unwrap();
        assert_eq!(value, json!([]));
    }

    #[test]
    fn test_sub_document_ignores_path() {
        let sub = json!({"authorName": {"value": "Doe, Jane"}});
        let path = QueryPath::resolve("datasetVersion/metadataBlocks/citation", "author");
        let value = extract(&sub, &path).unwrap();
        assert_eq!(value, sub);
    }

    #[test]
    fn test_singleton_unwrap_is_repeated() {
        let doc = json!({"wrapped": [["only"]]});
        let value = extract(&doc, &QueryPath::resolve("", "wrapped")).unwrap();
        assert_eq!(value, json!("only"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&json!("x")),
            Some(Shape::Scalar("x".to_string()))
        );
        assert_eq!(classify(&json!(42)), Some(Shape::Scalar("42".to_string())));
        assert!(matches!(classify(&json!({"a": 1})), Some(Shape::Object(_))));
        assert!(matches!(classify(&json!([1, 2])), Some(Shape::Sequence(_))));
        assert_eq!(classify(&Value::Null), None);
    }

    #[test]
    fn test_unwrap_value_field() {
        assert_eq!(
            unwrap_value_field(json!({"typeName": "title", "value": "T"})),
            json!("T")
        );
        assert_eq!(unwrap_value_field(json!({"other": 1})), json!({"other": 1}));
        assert_eq!(unwrap_value_field(json!("plain")), json!("plain"));
    }
}
