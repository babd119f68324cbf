//! Selection of the objects (and fields) to bake.
//!
//! A rule matches objects by exact class name and by a glob over the object
//! path. Its `datafield` is either `*` (all geometry) or a comma-separated
//! list of field names. Rules are stored as a JSON list:
//!
//! ```json
//! [{"classname": "MechanicalObject", "pathname": "*", "datafield": "*"}]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{SourceNode, SourceObject};

const WILDCARD: &str = "*";

/// One selection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRule {
    /// Class name to match exactly (`*` matches every class).
    pub classname: String,
    /// Glob over the object path.
    #[serde(default = "wildcard")]
    pub pathname: String,
    /// `*` or a comma-separated field list.
    #[serde(default = "wildcard")]
    pub datafield: String,
}

fn wildcard() -> String {
    WILDCARD.into()
}

impl SelectionRule {
    /// Rule selecting every object of a class with all its geometry.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            pathname: wildcard(),
            datafield: wildcard(),
        }
    }

    pub fn with_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = pathname.into();
        self
    }

    pub fn with_datafield(mut self, datafield: impl Into<String>) -> Self {
        self.datafield = datafield.into();
        self
    }

    /// Mechanical states and visual models, all geometry.
    pub fn default_rules() -> Vec<SelectionRule> {
        vec![Self::new("MechanicalObject"), Self::new("OglModel")]
    }

    /// Parsed field selection.
    pub fn fields(&self) -> FieldSelection {
        if self.datafield.trim() == WILDCARD {
            return FieldSelection::All;
        }
        FieldSelection::Named(
            self.datafield
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

/// Fields to write for a selected object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Position (or non-empty vertices), edges, triangles and quads.
    All,
    /// Exactly these fields; each one must exist.
    Named(Vec<String>),
}

/// An object picked by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub path: String,
    pub class_name: String,
    pub fields: FieldSelection,
}

/// Parse rules from their JSON text.
pub fn parse_rules(text: &str) -> Result<Vec<SelectionRule>> {
    Ok(serde_json::from_str(text)?)
}

/// Read rules from a JSON file.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<SelectionRule>> {
    parse_rules(&fs::read_to_string(path)?)
}

/// Apply `rules` to a hierarchy, rule by rule, each rule walking the tree
/// depth-first. An object picked by several rules keeps its first match.
/// Objects without a path cannot be baked and are never selected.
pub fn select(hierarchy: &SourceNode, rules: &[SelectionRule]) -> Result<Vec<Selected>> {
    let mut selected = Vec::new();
    let mut seen = HashSet::new();

    for rule in rules {
        let pattern = Pattern::new(&rule.pathname)?;
        let fields = rule.fields();
        let mut matches = Vec::new();
        collect(hierarchy, rule, &pattern, &mut matches);

        for object in matches {
            let (Some(path), Some(class_name)) = (&object.path, &object.class_name) else {
                continue;
            };
            if seen.insert(path.clone()) {
                selected.push(Selected {
                    path: path.clone(),
                    class_name: class_name.clone(),
                    fields: fields.clone(),
                });
            }
        }
    }

    Ok(selected)
}

fn collect<'a>(node: &'a SourceNode, rule: &SelectionRule, pattern: &Pattern, out: &mut Vec<&'a SourceObject>) {
    for object in &node.objects {
        let class_ok = rule.classname == WILDCARD || object.class_name.as_deref() == Some(rule.classname.as_str());
        let path_ok = object.path.as_deref().is_some_and(|p| pattern.matches(p));
        if class_ok && path_ok {
            out.push(object);
        }
    }
    for child in &node.children {
        collect(child, rule, pattern, out);
    }
}
