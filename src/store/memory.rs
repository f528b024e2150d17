//! In-memory document store.
//!
//! Evaluates filters with MongoDB semantics: a missing field reads as null,
//! range operators only compare values of the same kind, and `$regex` only
//! matches text and generated ids. Unique indexes are enforced on insert,
//! update and index creation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tokio::sync::RwLock;

use super::{
    DeleteOutcome, Document, DocumentStore, FindOptions, IndexSpec, InsertOutcome, StoreError,
    UpdateOutcome,
};
use crate::ast::SortOrder;
use crate::transpiler::{Condition, Filter, FilterOp};
use crate::value::TypedValue;

static NULL: TypedValue = TypedValue::Null;

#[derive(Debug, Default, Clone)]
struct Collection {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

/// A document store held entirely in memory, safe to share between tasks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON fixture of the form
    /// `{ "users": [ { "name": "Ann" }, ... ], ... }`.
    ///
    /// Documents go in as-is: no `_id` is generated and no case conversion
    /// is applied. Nested arrays and objects are rejected.
    pub fn from_json(fixture: &serde_json::Value) -> Result<Self, StoreError> {
        let object = fixture
            .as_object()
            .ok_or_else(|| StoreError::Backend("fixture must be a JSON object".to_string()))?;

        let mut collections = BTreeMap::new();
        for (name, docs) in object {
            let docs = docs.as_array().ok_or_else(|| {
                StoreError::Backend(format!("fixture collection '{}' must be an array", name))
            })?;

            let mut documents = Vec::with_capacity(docs.len());
            for doc in docs {
                documents.push(document_from_json(name, doc)?);
            }
            collections.insert(
                name.clone(),
                Collection {
                    documents,
                    indexes: Vec::new(),
                },
            );
        }

        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Seed a collection with documents, replacing what was there.
    pub async fn seed(&self, collection: &str, documents: Vec<Document>) {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().documents = documents;
    }

    /// Copy of every document in a collection, in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Names of the indexes defined on a collection.
    pub async fn index_names(&self, collection: &str) -> Vec<String> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Names of all collections.
    pub async fn collection_names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }
}

fn document_from_json(collection: &str, doc: &serde_json::Value) -> Result<Document, StoreError> {
    let object = doc.as_object().ok_or_else(|| {
        StoreError::Backend(format!("documents in '{}' must be JSON objects", collection))
    })?;

    object
        .iter()
        .map(|(key, value)| {
            TypedValue::from_json(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| {
                    StoreError::Backend(format!(
                        "field '{}' in '{}' holds a nested value",
                        key, collection
                    ))
                })
        })
        .collect()
}

/// A filter with its regular expressions compiled once.
struct Matcher<'f> {
    conditions: Vec<(&'f Condition, Option<Regex>)>,
}

impl<'f> Matcher<'f> {
    fn compile(filter: &'f Filter) -> Result<Self, StoreError> {
        let mut conditions = Vec::with_capacity(filter.conditions.len());
        for cond in &filter.conditions {
            let regex = match (cond.op, &cond.value) {
                (FilterOp::Regex, TypedValue::Text(pattern)) => Some(
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .dot_matches_new_line(true)
                        .build()
                        .map_err(|e| StoreError::Backend(format!("invalid pattern: {}", e)))?,
                ),
                (FilterOp::Regex, other) => {
                    return Err(StoreError::Backend(format!(
                        "$regex expects text, got {}",
                        other.kind()
                    )));
                }
                _ => None,
            };
            conditions.push((cond, regex));
        }
        Ok(Self { conditions })
    }

    fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(cond, regex)| {
            let actual = doc.get(&cond.field).unwrap_or(&NULL);
            match cond.op {
                FilterOp::Eq => actual.matches(&cond.value),
                FilterOp::Ne => !actual.matches(&cond.value),
                FilterOp::Lt => actual.compare(&cond.value) == Some(Ordering::Less),
                FilterOp::Lte => matches!(
                    actual.compare(&cond.value),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                FilterOp::Gt => actual.compare(&cond.value) == Some(Ordering::Greater),
                FilterOp::Gte => matches!(
                    actual.compare(&cond.value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                FilterOp::Regex => match (actual, regex) {
                    (TypedValue::Text(text), Some(re)) => re.is_match(text),
                    (TypedValue::GeneratedId(id), Some(re)) => re.is_match(&id.to_string()),
                    _ => false,
                },
            }
        })
    }
}

/// Cross-kind sort order: null, numbers, text, ids, bools, timestamps.
fn sort_rank(v: &TypedValue) -> u8 {
    match v {
        TypedValue::Null => 0,
        TypedValue::Number(_) => 1,
        TypedValue::Text(_) => 2,
        TypedValue::GeneratedId(_) => 3,
        TypedValue::Bool(_) => 4,
        TypedValue::Timestamp(_) => 5,
    }
}

fn sort_cmp(a: &TypedValue, b: &TypedValue) -> Ordering {
    sort_rank(a)
        .cmp(&sort_rank(b))
        .then_with(|| a.compare(b).unwrap_or(Ordering::Equal))
}

fn project(doc: &Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return doc.clone();
    }
    fields
        .iter()
        .filter_map(|f| doc.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}

fn same_key(index: &IndexSpec, a: &Document, b: &Document) -> bool {
    index.keys.iter().all(|k| {
        let left = a.get(k).unwrap_or(&NULL);
        let right = b.get(k).unwrap_or(&NULL);
        left.matches(right)
    })
}

/// First unique index that `documents` violate, if any.
fn unique_violation<'a>(indexes: &'a [IndexSpec], documents: &[Document]) -> Option<&'a IndexSpec> {
    indexes.iter().filter(|i| i.unique).find(|index| {
        documents.iter().enumerate().any(|(i, a)| {
            documents[i + 1..].iter().any(|b| same_key(index, a, b))
        })
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, options: FindOptions) -> Result<Vec<Document>, StoreError> {
        let matcher = Matcher::compile(&options.filter)?;
        let collections = self.collections.read().await;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&Document> = coll.documents.iter().filter(|d| matcher.matches(d)).collect();

        if let Some((field, order)) = &options.sort {
            found.sort_by(|a, b| {
                let ord = sort_cmp(a.get(field).unwrap_or(&NULL), b.get(field).unwrap_or(&NULL));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|n| n as usize).unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d, &options.projection))
            .collect())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<InsertOutcome, StoreError> {
        let inserted_id = match document.get("id").or_else(|| document.get("_id")) {
            Some(id) => id.clone(),
            None => {
                let id = TypedValue::generate_id();
                document.insert("_id".to_string(), id.clone());
                id
            }
        };

        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();

        for index in coll.indexes.iter().filter(|i| i.unique) {
            if coll.documents.iter().any(|d| same_key(index, d, &document)) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                });
            }
        }

        coll.documents.push(document.clone());
        Ok(InsertOutcome {
            inserted_id,
            document,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Filter,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let matcher = Matcher::compile(&filter)?;
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome {
                matched: Some(0),
                modified: Some(0),
            });
        };

        let mut updated = coll.documents.clone();
        let mut matched = 0u64;
        let mut modified = 0u64;

        for doc in updated.iter_mut().filter(|d| matcher.matches(d)) {
            matched += 1;
            let mut changed = false;
            for (field, value) in &set {
                if doc.get(field) != Some(value) {
                    doc.insert(field.clone(), value.clone());
                    changed = true;
                }
            }
            if changed {
                modified += 1;
            }
        }

        if modified > 0 {
            if let Some(index) = unique_violation(&coll.indexes, &updated) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                });
            }
            coll.documents = updated;
        }

        Ok(UpdateOutcome {
            matched: Some(matched),
            modified: Some(modified),
        })
    }

    async fn delete_many(&self, collection: &str, filter: Filter) -> Result<DeleteOutcome, StoreError> {
        let matcher = Matcher::compile(&filter)?;
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(DeleteOutcome { deleted: Some(0) });
        };

        let before = coll.documents.len();
        coll.documents.retain(|d| !matcher.matches(d));
        Ok(DeleteOutcome {
            deleted: Some((before - coll.documents.len()) as u64),
        })
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();

        if coll.indexes.iter().any(|i| i.name == index.name) {
            return Err(StoreError::IndexAlreadyExists(index.name));
        }
        if index.unique && unique_violation(std::slice::from_ref(&index), &coll.documents).is_some() {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                index: index.name,
            });
        }

        coll.indexes.push(index);
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, TypedValue)]) -> Document {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    async fn count(store: &MemoryStore, collection: &str, filter: Filter) -> Result<u64, StoreError> {
        let options = FindOptions {
            filter,
            ..Default::default()
        };
        Ok(store.find(collection, options).await?.len() as u64)
    }

    fn cond(field: &str, op: FilterOp, value: impl Into<TypedValue>) -> Filter {
        Filter {
            conditions: vec![Condition {
                field: field.to_string(),
                op,
                value: value.into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_insert_generates_id() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("users", doc(&[("name", "Ann".into())]))
            .await
            .unwrap();
        assert!(matches!(outcome.inserted_id, TypedValue::GeneratedId(_)));
        assert_eq!(outcome.document.get("_id"), Some(&outcome.inserted_id));
        assert!(store.collection_exists("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_keeps_supplied_id() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("users", doc(&[("id", "u-1".into())]))
            .await
            .unwrap();
        assert_eq!(outcome.inserted_id, TypedValue::from("u-1"));
        assert!(!outcome.document.contains_key("_id"));
    }

    #[tokio::test]
    async fn test_missing_field_reads_as_null() {
        let store = MemoryStore::new();
        store
            .seed(
                "users",
                vec![
                    doc(&[("name", "Ann".into()), ("deletedAt", TypedValue::Null)]),
                    doc(&[("name", "Bob".into())]),
                    doc(&[("name", "Cid".into()), ("deletedAt", TypedValue::now())]),
                ],
            )
            .await;

        let is_null = cond("deletedAt", FilterOp::Eq, TypedValue::Null);
        assert_eq!(count(&store, "users", is_null).await.unwrap(), 2);

        let not_null = cond("deletedAt", FilterOp::Ne, TypedValue::Null);
        assert_eq!(count(&store, "users", not_null).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_range_ignores_other_kinds() {
        let store = MemoryStore::new();
        store
            .seed(
                "t",
                vec![
                    doc(&[("n", 5.into())]),
                    doc(&[("n", "5".into())]),
                    doc(&[("n", 7.into())]),
                ],
            )
            .await;
        let filter = cond("n", FilterOp::Gte, 5);
        assert_eq!(count(&store, "t", filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit_project() {
        let store = MemoryStore::new();
        store
            .seed(
                "scores",
                vec![
                    doc(&[("name", "a".into()), ("score", 3.into())]),
                    doc(&[("name", "b".into()), ("score", 9.into())]),
                    doc(&[("name", "c".into()), ("score", 6.into())]),
                ],
            )
            .await;

        let found = store
            .find(
                "scores",
                FindOptions {
                    projection: vec!["name".to_string()],
                    sort: Some(("score".to_string(), SortOrder::Desc)),
                    skip: Some(1),
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(found, vec![doc(&[("name", "c".into())])]);
    }

    #[tokio::test]
    async fn test_unique_index() {
        let store = MemoryStore::new();
        let index = IndexSpec {
            name: "idx_email".to_string(),
            keys: vec!["email".to_string()],
            unique: true,
        };
        store.create_index("users", index.clone()).await.unwrap();
        assert!(matches!(
            store.create_index("users", index).await,
            Err(StoreError::IndexAlreadyExists(name)) if name == "idx_email"
        ));

        store
            .insert_one("users", doc(&[("email", "a@x.io".into())]))
            .await
            .unwrap();
        let dup = store
            .insert_one("users", doc(&[("email", "a@x.io".into())]))
            .await;
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));

        store
            .insert_one("users", doc(&[("email", "b@x.io".into())]))
            .await
            .unwrap();
        let clash = store
            .update_many(
                "users",
                cond("email", FilterOp::Eq, "b@x.io"),
                doc(&[("email", "a@x.io".into())]),
            )
            .await;
        assert!(matches!(clash, Err(StoreError::DuplicateKey { .. })));
        assert_eq!(store.documents("users").await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_counts_only_changed() {
        let store = MemoryStore::new();
        store
            .seed(
                "t",
                vec![doc(&[("flag", true.into())]), doc(&[("flag", false.into())])],
            )
            .await;
        let outcome = store
            .update_many("t", Filter::default(), doc(&[("flag", true.into())]))
            .await
            .unwrap();
        assert_eq!(outcome.matched, Some(2));
        assert_eq!(outcome.modified, Some(1));
    }

    #[tokio::test]
    async fn test_regex_case_insensitive() {
        let store = MemoryStore::new();
        store
            .seed(
                "t",
                vec![
                    doc(&[("s", "ABC".into())]),
                    doc(&[("s", "xab".into())]),
                    doc(&[("s", 1.into())]),
                ],
            )
            .await;
        let filter = cond("s", FilterOp::Regex, "^ab.*$");
        assert_eq!(count(&store, "t", filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_regex_matches_generated_id() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one("users", doc(&[("name", "Ann".into())]))
            .await
            .unwrap();
        let id = outcome.inserted_id.to_string();

        let prefix = format!("^{}.*$", &id[..8]);
        let filter = cond("_id", FilterOp::Regex, prefix.as_str());
        assert_eq!(count(&store, "users", filter).await.unwrap(), 1);

        let miss = cond("_id", FilterOp::Regex, "^zz.*$");
        assert_eq!(count(&store, "users", miss).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_regex_spans_newlines() {
        let store = MemoryStore::new();
        store
            .seed("notes", vec![doc(&[("body", "first\nsecond".into())])])
            .await;
        let filter = cond("body", FilterOp::Regex, "^first.*d$");
        assert_eq!(count(&store, "notes", filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_from_json_fixture() {
        let store = MemoryStore::from_json(&json!({
            "users": [
                { "name": "Ann", "age": 31, "verified": true },
                { "name": "Bob", "age": null }
            ]
        }))
        .unwrap();
        let docs = store.documents("users").await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("age"), Some(&TypedValue::Number(31.0)));

        assert!(MemoryStore::from_json(&json!({ "users": [{ "tags": ["a"] }] })).is_err());
        assert!(MemoryStore::from_json(&json!([])).is_err());
    }
}
