//! # Object Resolver
//!
//! Turns one raw store row into a plain, JSON-serializable tree. Raw mode
//! projects only locally stored properties; resolved mode additionally walks
//! the object's import chain through the relation cache, merging inherited
//! values beneath locally-set ones. Locally-set always wins; inherited
//! values only fill gaps.
//!
//! Resolution is pure with respect to the cache: no store access, and the
//! same row against the same cache always yields identical output.

use serde_json::Value;
use tracing::warn;

use crate::cache::RelationCache;
use crate::error::{ExportError, Result};
use crate::object_type::ObjectType;
use crate::store::{RawRow, ID_COLUMN};

/// Serialization mode for the plain object tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Only locally stored properties.
    #[default]
    Raw,
    /// Merge values inherited through templates, flattening the effective
    /// configuration.
    Resolved,
}

/// What to do when a row references a related object the cache does not
/// contain. The choice is explicit configuration, never accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Dangling references are fatal.
    Strict,
    /// Dangling references degrade to a null/empty field, with a warning.
    #[default]
    Lenient,
}

/// Identity fields never inherited from a template.
const NON_INHERITED: &[&str] = &["object_name", "object_type", "imports", "uuid"];

const IMPORTS: &str = "imports";
const GROUPS: &str = "groups";
const VARS: &str = "vars";

pub struct ObjectResolver {
    object_type: ObjectType,
    policy: ResolutionPolicy,
}

impl ObjectResolver {
    pub fn new(object_type: ObjectType, policy: ResolutionPolicy) -> Self {
        Self {
            object_type,
            policy,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Resolve one raw row into a plain object tree.
    pub fn resolve(
        &self,
        row: &RawRow,
        cache: &RelationCache,
        mode: ResolutionMode,
    ) -> Result<Value> {
        let tree = match mode {
            ResolutionMode::Raw => self.project_local(row, cache)?,
            ResolutionMode::Resolved => {
                let mut visited = Vec::new();
                let mut tree = self.effective_values(row, cache, &mut visited)?;
                self.validate_groups(&mut tree, cache)?;
                tree
            }
        };
        Ok(Value::Object(tree))
    }

    /// Project locally stored properties: scalar columns as-is, foreign keys
    /// replaced by the referenced object's name, imports/groups/vars passed
    /// through. The primary id is internal and omitted.
    fn project_local(&self, row: &RawRow, cache: &RelationCache) -> Result<RawRow> {
        let relations = self.object_type.relations();
        let mut tree = RawRow::new();

        for (column, value) in row {
            if column == ID_COLUMN {
                continue;
            }
            if relations.iter().any(|spec| spec.column == *column) {
                continue; // handled below
            }
            match column.as_str() {
                GROUPS => {
                    // An empty group list is unset, not an empty property.
                    if value.as_array().is_some_and(|a| !a.is_empty()) {
                        tree.insert(column.clone(), value.clone());
                    }
                }
                _ => {
                    tree.insert(column.clone(), value.clone());
                }
            }
        }

        for spec in relations {
            let Some(reference) = row.get(spec.column) else {
                continue;
            };
            let related = match reference {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|id| cache.lookup(spec.target, id)),
                Value::String(name) => cache.lookup_name(spec.target, name),
                _ => None,
            };
            match related {
                Some(record) => {
                    let name = record
                        .get(crate::store::NAME_COLUMN)
                        .cloned()
                        .unwrap_or(Value::Null);
                    tree.insert(spec.property.to_string(), name);
                }
                None => {
                    self.handle_dangling(spec.target, &reference.to_string())?;
                    tree.insert(spec.property.to_string(), Value::Null);
                }
            }
        }

        Ok(tree)
    }

    /// Flattened effective configuration: inherited values from the import
    /// chain (depth-first, ancestors first, later imports winning among
    /// themselves) overlaid with the row's own projection.
    fn effective_values(
        &self,
        row: &RawRow,
        cache: &RelationCache,
        visited: &mut Vec<String>,
    ) -> Result<RawRow> {
        let mut merged = RawRow::new();

        for import in import_names(row) {
            if visited.contains(&import) {
                continue; // cycle guard
            }
            visited.push(import.clone());

            let Some(template_row) = cache.lookup_name(self.object_type, &import) else {
                if !cache.covers(self.object_type) {
                    // The prefetch is supposed to cover the exported type's
                    // own templates; reaching this is an incomplete-prefetch
                    // bug, not a data problem.
                    debug_assert!(false, "relation cache missing {}", self.object_type);
                }
                self.handle_dangling(self.object_type, &import)?;
                continue;
            };
            let template_row = template_row.clone();
            let inherited = self.effective_values(&template_row, cache, visited)?;
            overlay(&mut merged, inherited);
        }

        // Identity fields stay with the object that owns them.
        for key in NON_INHERITED {
            merged.remove(*key);
        }

        let local = self.project_local(row, cache)?;
        overlay(&mut merged, local);
        Ok(merged)
    }

    /// Resolved-mode group validation: every referenced group must exist in
    /// the cache; dangling names degrade to being dropped in lenient mode.
    fn validate_groups(&self, tree: &mut RawRow, cache: &RelationCache) -> Result<()> {
        let Some(group_type) = self.object_type.group_type() else {
            return Ok(());
        };
        let Some(Value::Array(names)) = tree.get(GROUPS).cloned() else {
            return Ok(());
        };

        let mut valid = Vec::with_capacity(names.len());
        for name in &names {
            let known = name
                .as_str()
                .is_some_and(|n| cache.lookup_name(group_type, n).is_some());
            if known {
                valid.push(name.clone());
            } else {
                self.handle_dangling(group_type, &name.to_string())?;
            }
        }
        tree.insert(GROUPS.to_string(), Value::Array(valid));
        Ok(())
    }

    fn handle_dangling(&self, relation: ObjectType, reference: &str) -> Result<()> {
        match self.policy {
            ResolutionPolicy::Strict => Err(ExportError::DanglingReference {
                relation,
                reference: reference.to_string(),
            }),
            ResolutionPolicy::Lenient => {
                warn!(
                    object_type = %self.object_type,
                    relation = %relation,
                    reference = %reference,
                    "dangling reference left unresolved"
                );
                Ok(())
            }
        }
    }
}

/// Overlay `incoming` onto `base`. Custom vars merge per key (incoming keys
/// win); everything else replaces wholesale.
fn overlay(base: &mut RawRow, incoming: RawRow) {
    for (key, value) in incoming {
        if key == VARS {
            let merged_vars = base.entry(VARS.to_string()).or_insert_with(|| {
                Value::Object(serde_json::Map::new())
            });
            if let (Some(target), Some(source)) =
                (merged_vars.as_object_mut(), value.as_object())
            {
                for (var, val) in source {
                    target.insert(var.clone(), val.clone());
                }
                continue;
            }
            *merged_vars = value;
        } else {
            base.insert(key, value);
        }
    }
}

fn import_names(row: &RawRow) -> Vec<String> {
    row.get(IMPORTS)
        .and_then(Value::as_array)
        .map(|imports| {
            imports
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
