//! The document-store seam the executor drives.
//!
//! The store handle is opened and owned by the caller; the executor only
//! borrows it for one operation per statement.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::ast::SortOrder;
use crate::transpiler::Filter;
use crate::value::TypedValue;

pub use memory::MemoryStore;

/// A stored document, keyed by store-case field name.
pub type Document = BTreeMap<String, TypedValue>;

/// Errors reported by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An index with this name already exists on the collection.
    #[error("Index '{0}' already exists")]
    IndexAlreadyExists(String),

    /// A unique index rejected the write.
    #[error("Duplicate key for unique index '{index}' on '{collection}'")]
    DuplicateKey { collection: String, index: String },

    /// Any other driver failure.
    #[error("{0}")]
    Backend(String),
}

/// Options for a filtered read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Filter,
    /// Store-case fields to return; empty returns whole documents.
    pub projection: Vec<String>,
    pub sort: Option<(String, SortOrder)>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

/// Index to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    /// Store-case key fields, in order.
    pub keys: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// `id` or `_id` of the new document.
    pub inserted_id: TypedValue,
    /// The document as stored, including any generated `_id`.
    pub document: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: Option<u64>,
    pub modified: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub deleted: Option<u64>,
}

/// Operations of a schemaless document store, in MongoDB's vocabulary.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, options: FindOptions) -> Result<Vec<Document>, StoreError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertOutcome, StoreError>;

    /// Apply `$set` with `set` to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: Filter,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_many(&self, collection: &str, filter: Filter) -> Result<DeleteOutcome, StoreError>;

    /// Fails with [`StoreError::IndexAlreadyExists`] when the name is taken.
    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<(), StoreError>;

    /// Collections are created implicitly by their first write.
    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError>;
}
