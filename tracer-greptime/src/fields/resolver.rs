use crate::fields::catalog::CANONICAL_ORDER;
use crate::fields::FieldMapping;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPair {
    pub source: String,
    pub target: String,
}

/// Picks the override mapping when it has any entry, the defaults otherwise.
/// Entries with a blank target are dropped, that is how a column gets disabled.
/// Catalog fields come first in canonical order, then the remaining sources sorted
/// by name, so equal inputs always produce the same column order.
pub fn resolve(override_mapping: &FieldMapping, defaults: &FieldMapping) -> Vec<FieldPair> {
    let fields = if override_mapping.is_empty() {
        defaults
    } else {
        override_mapping
    };
    let target_of = |source: &str| {
        fields
            .get(source)
            .map(|target| target.trim())
            .filter(|target| !target.is_empty())
    };
    let mut pairs = Vec::with_capacity(fields.len());
    let mut used = HashSet::new();
    for source in CANONICAL_ORDER {
        if let Some(target) = target_of(source) {
            pairs.push(FieldPair {
                source: source.to_string(),
                target: target.to_string(),
            });
            used.insert(source);
        }
    }
    let mut extras: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|source| !used.contains(*source) && target_of(*source).is_some())
        .collect();
    extras.sort_unstable();
    for source in extras {
        if let Some(target) = target_of(source) {
            pairs.push(FieldPair {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }
    pairs
}
