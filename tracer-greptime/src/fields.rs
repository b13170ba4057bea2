//! Resolution of span source fields into an ordered column plan.

pub mod catalog;
pub mod resolver;

use crate::table::{ColumnType, SemanticKind};
use std::collections::HashMap;

pub use catalog::{classify, default_fields, FieldSpec};
pub use resolver::{resolve, FieldPair};

/// Source field name -> target column name
pub type FieldMapping = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlanEntry {
    pub source: String,
    pub target: String,
    pub kind: SemanticKind,
    pub column_type: ColumnType,
}

/// Ordered columns of a write. Depends only on the mappings, never on span data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    entries: Vec<ColumnPlanEntry>,
}

impl ColumnPlan {
    pub fn resolve(override_mapping: &FieldMapping, defaults: &FieldMapping) -> Self {
        let entries = resolve(override_mapping, defaults)
            .into_iter()
            .map(|FieldPair { source, target }| {
                let FieldSpec { kind, column_type } = classify(&source);
                ColumnPlanEntry {
                    source,
                    target,
                    kind,
                    column_type,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ColumnPlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnPlanEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
