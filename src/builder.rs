//! Rule-driven entity construction
//!
//! The three mutually recursive algorithms that populate the graph: the
//! root entity builder (rule entities "Root"/"Metadata"), the contextual
//! entity builder (everything else), and reference resolution for
//! `refersTo:` expressions. All recursion goes through an explicit
//! per-build [`BuildContext`] carrying the rule table, the graph under
//! construction, and the set of entity names currently being built (for
//! cycle detection).
//!
//! Candidate expressions that do not match the extracted data are skipped,
//! not fatal: rule tables may carry speculative fallbacks for irregular
//! input. Each skip is logged at debug level.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::entity::Entity;
use crate::error::BuildError;
use crate::extract::{classify, extract, scalar_string, unwrap_value_field, Shape};
use crate::graph::EntityGraph;
use crate::path::QueryPath;
use crate::rules::{RefTarget, RuleTable, ValueExpression};
use crate::vocab::ROOT_ENTITY_NAMES;

/// Per-build state threaded through every recursive call
pub struct BuildContext<'a> {
    rules: &'a RuleTable,
    pub graph: EntityGraph,
    /// Entity names currently on the build stack
    in_progress: Vec<String>,
    /// Number of reference ids attached via `refersTo:` expressions
    pub references_resolved: usize,
}

impl<'a> BuildContext<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self {
            rules,
            graph: EntityGraph::new(),
            in_progress: Vec::new(),
            references_resolved: 0,
        }
    }

    /// Build the named entity, dispatching on its first rule row:
    /// a blank source location means the root builder, anything else
    /// the contextual builder.
    pub fn add_entity(&mut self, doc: &Value, entity_name: &str) -> Result<Vec<String>, BuildError> {
        let rows = self.rules.rules_for(entity_name)?;
        let first = rows[0];
        if first.source.trim().is_empty() && first.source_field.trim().is_empty() {
            self.add_root_entity(doc, entity_name)
        } else {
            self.add_contextual_entity(doc, entity_name)
        }
    }

    /// Build a root-level entity from its rule rows.
    ///
    /// The first row is an anchor, not data, and is skipped. Returns the
    /// ids the pass established.
    pub fn add_root_entity(
        &mut self,
        doc: &Value,
        entity_name: &str,
    ) -> Result<Vec<String>, BuildError> {
        self.enter(entity_name)?;
        let result = self.root_entity_rows(doc, entity_name);
        self.leave(entity_name);
        result
    }

    fn root_entity_rows(
        &mut self,
        doc: &Value,
        entity_name: &str,
    ) -> Result<Vec<String>, BuildError> {
        let rows = self.rules.rules_for(entity_name)?;
        let mut ids = Vec::new();
        let mut id: Option<String> = None;
        let mut entity = Entity::new();

        for row in rows.iter().skip(1) {
            let target = row.target_property.as_str();
            match row.expression() {
                ValueExpression::RefersTo(ref_target) => {
                    let referred = self.resolve_reference(doc, &ref_target)?;
                    entity.set_references(target, referred);
                }
                ValueExpression::Literal(literal) => {
                    entity.set_literal(target, literal.clone());
                    if target == "@id" {
                        id = Some(literal.clone());
                        ids.push(literal.clone());
                        self.graph.put(&literal, entity.clone());
                    }
                }
                expr @ (ValueExpression::Empty | ValueExpression::Field(_)) => {
                    let key = match &expr {
                        ValueExpression::Field(k) => k.as_str(),
                        _ => "",
                    };
                    let path = QueryPath::resolve(&row.source, &row.source_field);
                    let extracted = unwrap_value_field(extract(doc, &path)?);
                    self.root_entity_value(&mut entity, target, key, extracted);
                }
            }
        }

        if id.is_some() {
            self.graph.upsert(&entity)?;
        }
        Ok(ids)
    }

    /// Attach one extracted value to a root entity property, dispatching
    /// on its shape
    fn root_entity_value(&mut self, entity: &mut Entity, target: &str, key: &str, extracted: Value) {
        match classify(&extracted) {
            Some(Shape::Scalar(s)) => {
                entity.property_mut(target).add(s);
            }
            Some(Shape::Object(map)) => match map.get(key) {
                Some(inner) => {
                    let inner = unwrap_value_field(inner.clone());
                    match scalar_string(&inner) {
                        Some(s) => entity.property_mut(target).add(s),
                        None => debug!(property = target, key, "extracted sub-value has no scalar form, skipped"),
                    }
                }
                None => debug!(property = target, key, "key not present in extracted object, skipped"),
            },
            Some(Shape::Sequence(items)) => {
                // A {value: [...]} unwrap can leave a single nested sequence
                let items = if items.len() == 1 && items[0].is_array() {
                    match items.into_iter().next() {
                        Some(Value::Array(inner)) => inner,
                        _ => Vec::new(),
                    }
                } else {
                    items
                };
                match items.first() {
                    Some(Value::Object(_)) => {
                        for item in &items {
                            if let Value::Object(map) = item {
                                self.root_entity_sequence_item(entity, target, key, map);
                            }
                        }
                    }
                    Some(_) => {
                        let values = items.iter().filter_map(scalar_string);
                        entity.property_mut(target).merge(values);
                    }
                    None => {}
                }
            }
            None => debug!(property = target, "extracted value has no usable shape, skipped"),
        }
    }

    /// One entry of a sequence-of-maps extraction: prefer a direct key
    /// match, fall back to a `typeName == key` sibling pattern, skip
    /// entries matching neither
    fn root_entity_sequence_item(
        &mut self,
        entity: &mut Entity,
        target: &str,
        key: &str,
        map: &Map<String, Value>,
    ) {
        let value = if let Some(v) = map.get(key) {
            v.clone()
        } else if map.get("typeName").and_then(Value::as_str) == Some(key) {
            map.get("value").cloned().unwrap_or(Value::Null)
        } else {
            debug!(property = target, key, "sequence entry matches neither key nor typeName, skipped");
            return;
        };

        let value = unwrap_value_field(value);
        match scalar_string(&value) {
            Some(s) => entity.property_mut(target).add(s),
            None => debug!(property = target, key, "sequence entry value has no scalar form, skipped"),
        }
    }

    /// Build a contextual entity (anything but "Root"/"Metadata", which
    /// delegate to the root builder).
    ///
    /// Extracts once from the first rule row's location, then applies the
    /// full candidate-expression table to the result: one entity for a
    /// scalar or object, one entity per element for a sequence.
    pub fn add_contextual_entity(
        &mut self,
        doc: &Value,
        entity_name: &str,
    ) -> Result<Vec<String>, BuildError> {
        if ROOT_ENTITY_NAMES.contains(&entity_name) {
            return self.add_root_entity(doc, entity_name);
        }
        self.enter(entity_name)?;
        let result = self.contextual_entity_rows(doc, entity_name);
        self.leave(entity_name);
        result
    }

    fn contextual_entity_rows(
        &mut self,
        doc: &Value,
        entity_name: &str,
    ) -> Result<Vec<String>, BuildError> {
        let rows = self.rules.rules_for(entity_name)?;
        let first = rows[0];
        let path = QueryPath::resolve(&first.source, &first.source_field);
        let extracted = extract(doc, &path)?;

        // targetPropertyName -> candidate expressions, tried in order.
        // A later row for the same property replaces the earlier one.
        let mut props: IndexMap<String, Vec<ValueExpression>> = IndexMap::new();
        for row in &rows {
            props.insert(row.target_property.clone(), row.candidates());
        }

        let mut ids = Vec::new();
        match classify(&extracted) {
            Some(Shape::Scalar(scalar)) => {
                self.contextual_entity_from_scalar(&scalar, &props, &mut ids)?;
            }
            Some(Shape::Object(map)) => {
                self.contextual_entity_from_map(&map, &props, &mut ids)?;
            }
            Some(Shape::Sequence(items)) => {
                for item in &items {
                    match item {
                        Value::Object(map) => {
                            self.contextual_entity_from_map(map, &props, &mut ids)?;
                        }
                        other => debug!(
                            entity = entity_name,
                            "non-object sequence element {other}, skipped"
                        ),
                    }
                }
            }
            None => debug!(entity = entity_name, "extraction yielded nothing usable"),
        }
        Ok(ids)
    }

    /// Scalar extraction: a single entity whose unquoted candidates all
    /// resolve to the scalar itself
    fn contextual_entity_from_scalar(
        &mut self,
        scalar: &str,
        props: &IndexMap<String, Vec<ValueExpression>>,
        ids: &mut Vec<String>,
    ) -> Result<(), BuildError> {
        let mut entity = Entity::new();
        let mut id: Option<String> = None;

        for (property, candidates) in props {
            if property.trim().is_empty() {
                continue;
            }
            for candidate in candidates {
                let value = match candidate {
                    ValueExpression::Literal(literal) => literal.clone(),
                    _ => scalar.to_string(),
                };
                entity.property_mut(property).add(value);
                if property == "@id" {
                    id = Some(scalar.to_string());
                    ids.push(scalar.to_string());
                    self.graph.put(scalar, entity.clone());
                }
            }
        }

        if id.is_some() {
            self.graph.upsert(&entity)?;
        }
        Ok(())
    }

    /// Object extraction: a single entity, each property taking the first
    /// candidate expression that succeeds
    fn contextual_entity_from_map(
        &mut self,
        map: &Map<String, Value>,
        props: &IndexMap<String, Vec<ValueExpression>>,
        ids: &mut Vec<String>,
    ) -> Result<(), BuildError> {
        let mut entity = Entity::new();
        let mut id: Option<String> = None;

        for (property, candidates) in props {
            for candidate in candidates {
                match candidate {
                    ValueExpression::Literal(literal) => {
                        entity.property_mut(property).add(literal.clone());
                        break;
                    }
                    ValueExpression::RefersTo(ref_target) => {
                        // Narrow the document to this object for the
                        // recursive build
                        let sub_doc = Value::Object(map.clone());
                        let referred = self.resolve_reference(&sub_doc, ref_target)?;
                        entity.set_references(property, referred);
                        break;
                    }
                    ValueExpression::Empty | ValueExpression::Field(_) => {
                        let key = match candidate {
                            ValueExpression::Field(k) => k.as_str(),
                            _ => "",
                        };
                        let Some(found) = map.get(key) else {
                            debug!(property = %property, key, "candidate key absent, trying next");
                            continue;
                        };
                        // The key exists: this candidate wins even when its
                        // shape turns out unusable
                        let unwrapped = unwrap_value_field(found.clone());
                        match scalar_string(&unwrapped) {
                            Some(s) => {
                                entity.property_mut(property).add(s.clone());
                                if property == "@id" {
                                    id = Some(s.clone());
                                    ids.push(s.clone());
                                    self.graph.put(&s, entity.clone());
                                }
                            }
                            None => debug!(
                                property = %property,
                                key,
                                "candidate value has no scalar form, skipped"
                            ),
                        }
                        break;
                    }
                }
            }
        }

        if id.is_some() {
            self.graph.upsert(&entity)?;
        }
        Ok(())
    }

    /// Resolve a `refersTo:` target to the list of referenced ids.
    ///
    /// A quoted literal target is the id itself. An entity-name target
    /// triggers a recursive contextual build against the current
    /// extraction context; when that yields nothing but the context
    /// object already carries the referenced entity's id inline (under
    /// its `@id` rule's field), the id is read directly from there.
    pub fn resolve_reference(
        &mut self,
        doc: &Value,
        target: &RefTarget,
    ) -> Result<Vec<String>, BuildError> {
        let ids = match target {
            RefTarget::Literal(id) => vec![id.clone()],
            RefTarget::Entity(entity_name) => {
                let mut ids = self.add_contextual_entity(doc, entity_name)?;
                if ids.is_empty() {
                    if let Some(map) = doc.as_object() {
                        ids = inline_referred_ids(self.rules, map, entity_name)
                            .unwrap_or_default();
                    }
                }
                ids
            }
        };
        self.references_resolved += ids.len();
        Ok(ids)
    }

    fn enter(&mut self, entity_name: &str) -> Result<(), BuildError> {
        if self.in_progress.iter().any(|n| n == entity_name) {
            return Err(BuildError::CycleDetected(entity_name.to_string()));
        }
        self.in_progress.push(entity_name.to_string());
        Ok(())
    }

    fn leave(&mut self, entity_name: &str) {
        if let Some(pos) = self.in_progress.iter().rposition(|n| n == entity_name) {
            self.in_progress.remove(pos);
        }
    }
}

/// Read a referenced entity's id straight from a parent value that
/// already carries it inline, keyed by the entity's `@id` rule field.
/// One `{value: ...}` wrapper level is unwrapped.
pub fn inline_referred_ids(
    rules: &RuleTable,
    map: &Map<String, Value>,
    entity_name: &str,
) -> Result<Vec<String>, BuildError> {
    let label = rules.id_field_label(entity_name)?;
    let Some(found) = map.get(label.trim()) else {
        return Ok(Vec::new());
    };
    let unwrapped = unwrap_value_field(found.clone());
    Ok(scalar_string(&unwrapped).into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MappingRule;
    use serde_json::json;

    fn rule(entity: &str, source: &str, field: &str, target: &str, value: &str) -> MappingRule {
        MappingRule {
            entity: entity.to_string(),
            source: source.to_string(),
            source_field: field.to_string(),
            target_property: target.to_string(),
            value: value.to_string(),
        }
    }

    fn citation_dataset() -> Value {
        json!({
            "datasetVersion": {
                "metadataBlocks": {
                    "citation": {
                        "fields": [
                            {"typeName": "title", "value": "Sample"},
                            {"typeName": "subject", "value": ["Medicine", "Biology", "Medicine"]},
                            {
                                "typeName": "author",
                                "value": [
                                    {
                                        "authorName": {"typeName": "authorName", "value": "Doe, Jane"},
                                        "authorIdentifier": {"typeName": "authorIdentifier", "value": "0000-0001"}
                                    },
                                    {
                                        "authorName": {"typeName": "authorName", "value": "Roe, Richard"},
                                        "authorIdentifier": {"typeName": "authorIdentifier", "value": "0000-0002"}
                                    }
                                ]
                            }
                        ]
                    }
                }
            }
        })
    }

    fn metadata_rules() -> Vec<MappingRule> {
        vec![
            rule("Metadata", "", "", "", ""),
            rule("Metadata", "", "", "@id", "\"ds1\""),
            rule("Metadata", "", "", "@type", "\"Dataset\""),
            rule(
                "Metadata",
                "datasetVersion/metadataBlocks/citation",
                "title",
                "name",
                "",
            ),
        ]
    }

    #[test]
    fn test_root_entity_literals_and_extraction() {
        let table = RuleTable::new(metadata_rules());
        let mut ctx = BuildContext::new(&table);
        let ids = ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        assert_eq!(ids, vec!["ds1".to_string()]);
        let entity = ctx.graph.get("ds1").unwrap();
        assert_eq!(entity.get("@type").unwrap().values(), &["Dataset".to_string()]);
        assert_eq!(entity.get("name").unwrap().values(), &["Sample".to_string()]);
    }

    #[test]
    fn test_root_entity_skips_first_row() {
        // The anchor row carries a literal that must never land on the entity
        let mut rules = vec![rule("Metadata", "", "", "ignored", "\"anchor\"")];
        rules.extend(metadata_rules().into_iter().skip(1));
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        let entity = ctx.graph.get("ds1").unwrap();
        assert!(entity.get("ignored").is_none());
    }

    #[test]
    fn test_root_entity_multi_valued_with_dedupe() {
        let mut rules = metadata_rules();
        rules.push(rule(
            "Metadata",
            "datasetVersion/metadataBlocks/citation",
            "subject",
            "about",
            "",
        ));
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        let about = ctx.graph.get("ds1").unwrap().get("about").unwrap();
        assert_eq!(
            about.values(),
            &["Medicine".to_string(), "Biology".to_string()]
        );
    }

    #[test]
    fn test_root_entity_sequence_of_maps_projection() {
        let mut rules = metadata_rules();
        rules.push(rule(
            "Metadata",
            "datasetVersion/metadataBlocks/citation",
            "author",
            "creator",
            "authorName",
        ));
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        let creator = ctx.graph.get("ds1").unwrap().get("creator").unwrap();
        assert_eq!(
            creator.values(),
            &["Doe, Jane".to_string(), "Roe, Richard".to_string()]
        );
    }

    fn author_rules() -> Vec<MappingRule> {
        vec![
            rule(
                "Author",
                "datasetVersion/metadataBlocks/citation",
                "author",
                "@id",
                "authorIdentifier",
            ),
            rule("Author", "", "", "@type", "\"Person\""),
            rule("Author", "", "", "name", "authorName"),
        ]
    }

    #[test]
    fn test_contextual_entity_per_sequence_element() {
        let table = RuleTable::new(author_rules());
        let mut ctx = BuildContext::new(&table);
        let ids = ctx
            .add_contextual_entity(&citation_dataset(), "Author")
            .unwrap();

        assert_eq!(ids, vec!["0000-0001".to_string(), "0000-0002".to_string()]);
        let first = ctx.graph.get("0000-0001").unwrap();
        assert_eq!(first.get("name").unwrap().values(), &["Doe, Jane".to_string()]);
        assert_eq!(first.get("@type").unwrap().values(), &["Person".to_string()]);
    }

    #[test]
    fn test_contextual_candidate_fallback() {
        let mut rules = author_rules();
        // displayName is absent in the data, authorName is the fallback
        rules[2].value = "displayName, authorName".to_string();
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_contextual_entity(&citation_dataset(), "Author")
            .unwrap();

        let first = ctx.graph.get("0000-0001").unwrap();
        assert_eq!(first.get("name").unwrap().values(), &["Doe, Jane".to_string()]);
    }

    #[test]
    fn test_refers_to_builds_contextual_entities() {
        let mut rules = metadata_rules();
        rules.push(rule("Metadata", "", "", "author", "refersTo:Author"));
        rules.extend(author_rules());
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        let author = ctx.graph.get("ds1").unwrap().get("author").unwrap();
        assert!(author.is_reference());
        assert_eq!(
            author.render(),
            Some(json!([{"@id": "0000-0001"}, {"@id": "0000-0002"}]))
        );
        // Referred entities were registered as contextual entities
        assert!(ctx.graph.get("0000-0002").is_some());
        assert_eq!(ctx.references_resolved, 2);
    }

    #[test]
    fn test_refers_to_literal_id() {
        let mut rules = metadata_rules();
        rules.push(rule(
            "Metadata",
            "",
            "",
            "about",
            "refersTo:\"ro-crate-metadata.json\"",
        ));
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        ctx.add_entity(&citation_dataset(), "Metadata").unwrap();

        let about = ctx.graph.get("ds1").unwrap().get("about").unwrap();
        assert_eq!(about.render(), Some(json!({"@id": "ro-crate-metadata.json"})));
    }

    #[test]
    fn test_cycle_detection() {
        let rules = vec![
            rule("A", "datasetVersion/metadataBlocks/citation", "author", "@id", "authorIdentifier"),
            rule("A", "", "", "peer", "refersTo:B"),
            rule("B", "datasetVersion/metadataBlocks/citation", "author", "@id", "authorIdentifier"),
            rule("B", "", "", "peer", "refersTo:A"),
        ];
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        let result = ctx.add_contextual_entity(&citation_dataset(), "A");
        assert!(matches!(result, Err(BuildError::CycleDetected(_))));
    }

    #[test]
    fn test_undefined_refers_to_entity() {
        let mut rules = metadata_rules();
        rules.push(rule("Metadata", "", "", "author", "refersTo:Nowhere"));
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        let result = ctx.add_entity(&citation_dataset(), "Metadata");
        assert!(matches!(result, Err(BuildError::NoRules(_))));
    }

    #[test]
    fn test_inline_referred_ids() {
        let table = RuleTable::new(author_rules());
        let map = json!({
            "authorIdentifier": {"typeName": "authorIdentifier", "value": "0000-0009"}
        });
        let ids = inline_referred_ids(&table, map.as_object().unwrap(), "Author").unwrap();
        assert_eq!(ids, vec!["0000-0009".to_string()]);
    }

    #[test]
    fn test_contextual_scalar_extraction() {
        let rules = vec![
            rule("License", "datasetVersion/metadataBlocks/citation", "license", "@id", ""),
            rule("License", "", "", "@type", "\"CreativeWork\""),
        ];
        let doc = json!({
            "datasetVersion": {
                "metadataBlocks": {
                    "citation": {
                        "fields": [
                            {"typeName": "license", "value": "CC0-1.0"}
                        ]
                    }
                }
            }
        });
        let table = RuleTable::new(rules);
        let mut ctx = BuildContext::new(&table);
        let ids = ctx.add_contextual_entity(&doc, "License").unwrap();

        assert_eq!(ids, vec!["CC0-1.0".to_string()]);
        let entity = ctx.graph.get("CC0-1.0").unwrap();
        assert_eq!(
            entity.get("@type").unwrap().values(),
            &["CreativeWork".to_string()]
        );
    }
}
