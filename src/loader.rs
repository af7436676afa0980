//! Loading the rule table and dataset from disk
//!
//! The rule table ships as a CSV with a header row
//! `entity,source,sourceField,targetPropertyName,value`. Value cells may be
//! double-quoted since candidate lists contain commas.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::BuildError;
use crate::rules::{MappingRule, RuleTable};

const COLUMNS: [&str; 5] = ["entity", "source", "sourceField", "targetPropertyName", "value"];

/// Parse a rule table from CSV text
pub fn parse_rules_csv(text: &str) -> Result<RuleTable, BuildError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| BuildError::InvalidRules("empty rule table".to_string()))?;
    let header_cells = split_csv_line(header);
    let mut indices = [0usize; 5];
    for (i, column) in COLUMNS.iter().enumerate() {
        indices[i] = header_cells
            .iter()
            .position(|c| c.trim() == *column)
            .ok_or_else(|| {
                BuildError::InvalidRules(format!("missing column '{}' in header", column))
            })?;
    }

    let mut rules = Vec::new();
    for line in lines {
        let cells = split_csv_line(line);
        let cell = |i: usize| cells.get(indices[i]).cloned().unwrap_or_default();
        rules.push(MappingRule {
            entity: cell(0).trim().to_string(),
            source: cell(1).trim().to_string(),
            source_field: cell(2).trim().to_string(),
            target_property: cell(3).trim().to_string(),
            value: cell(4).trim().to_string(),
        });
    }
    Ok(RuleTable::new(rules))
}

/// Split one CSV line, honoring double-quoted cells ("" escapes a quote).
/// Quotes around a whole cell are removed; the cell content is otherwise
/// kept raw for the expression parser.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                in_quotes = true;
                current.clear();
            }
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

/// Load a rule table from a CSV file
pub fn load_rules(path: impl AsRef<Path>) -> Result<RuleTable, BuildError> {
    let text = fs::read_to_string(path)?;
    parse_rules_csv(&text)
}

/// Load a dataset document from a JSON file
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Value, BuildError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
