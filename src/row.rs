//! Result rows handed back to callers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::case::{to_caller_case, to_store_case};
use crate::store::Document;
use crate::value::TypedValue;

/// One result row, keyed by field name.
///
/// Shaped rows carry every field under both its store-case and caller-case
/// name when the two differ, so `row.get("created_at")` and
/// `row.get("createdAt")` see the same value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: BTreeMap<String, TypedValue>,
}

impl Row {
    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypedValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, TypedValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn with_aliases(fields: BTreeMap<String, TypedValue>, alias: fn(&str) -> String) -> Row {
    let mut shaped = fields.clone();
    for (key, value) in fields {
        let other = alias(&key);
        if other != key {
            shaped.entry(other).or_insert(value);
        }
    }
    Row { fields: shaped }
}

/// Shape a stored document: each store-case key also appears in caller case.
/// A key already present in the document is never overwritten by an alias.
pub fn shape_document(document: Document) -> Row {
    with_aliases(document, to_caller_case)
}

/// Shape a relational row: each caller-case column also appears in store case.
pub fn shape_columns(columns: BTreeMap<String, TypedValue>) -> Row {
    with_aliases(columns, to_store_case)
}
