//! Statement execution against a document store.
//!
//! A [`Translator`] parses each statement, translates it into exactly one
//! store operation and shapes the outcome into a [`QueryResult`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::ast::{CreateIndex, CreateTable, Delete, Insert, Select, Statement, Update};
use crate::case::to_store_case;
use crate::error::{TranslationError, TranslationResult};
use crate::parser;
use crate::row::{shape_document, Row};
use crate::store::{Document, DocumentStore, FindOptions, IndexSpec, StoreError};
use crate::transpiler::{build_assignments, build_filter};
use crate::value::TypedValue;

/// Anything that runs parameterized statement text and returns rows.
#[async_trait]
pub trait QueryInterface: Send + Sync {
    async fn query(&self, text: &str, params: &[TypedValue]) -> TranslationResult<QueryResult>;
}

/// Which operation produced a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandTag {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    CreateIndex,
    AlterTable,
    /// `DO` blocks and transaction control, accepted without a store call.
    Inert,
    /// Unrecognized text tolerated outside strict mode.
    Ignored,
    /// Statement handed to a relational backend as-is.
    Passthrough,
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandTag::Select => "SELECT",
            CommandTag::Insert => "INSERT",
            CommandTag::Update => "UPDATE",
            CommandTag::Delete => "DELETE",
            CommandTag::CreateTable => "CREATE TABLE",
            CommandTag::CreateIndex => "CREATE INDEX",
            CommandTag::AlterTable => "ALTER TABLE",
            CommandTag::Inert => "INERT",
            CommandTag::Ignored => "IGNORED",
            CommandTag::Passthrough => "PASSTHROUGH",
        };
        write!(f, "{}", s)
    }
}

/// Result of one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Returned rows for reads, affected documents for writes.
    pub row_count: u32,
    pub command: CommandTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<TypedValue>,
}

impl QueryResult {
    /// No rows, nothing affected.
    pub fn empty(command: CommandTag) -> Self {
        Self {
            rows: Vec::new(),
            row_count: 0,
            command,
            inserted_id: None,
        }
    }

    pub fn from_rows(command: CommandTag, rows: Vec<Row>) -> Self {
        Self {
            row_count: saturate(rows.len() as u64),
            rows,
            command,
            inserted_id: None,
        }
    }

    pub fn affected(command: CommandTag, count: u64) -> Self {
        Self {
            row_count: saturate(count),
            ..Self::empty(command)
        }
    }

    /// Accepted without touching the store.
    pub fn is_inert(&self) -> bool {
        matches!(self.command, CommandTag::Inert | CommandTag::AlterTable)
    }

    /// Unrecognized statement that was skipped rather than executed.
    pub fn is_ignored(&self) -> bool {
        self.command == CommandTag::Ignored
    }
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Projected columns a document lacks read as NULL, as a relational driver returns them.
fn fill_missing(mut doc: Document, projection: &[String]) -> Document {
    for field in projection {
        doc.entry(field.clone()).or_insert(TypedValue::Null);
    }
    doc
}

/// Execution policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Fail on unrecognized statements instead of returning an empty result.
    pub strict: bool,
}

/// Runs SQL statements against a caller-owned document store.
pub struct Translator<S> {
    store: Arc<S>,
    config: TranslatorConfig,
}

impl<S> Clone for Translator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: DocumentStore> Translator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, TranslatorConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: TranslatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> TranslatorConfig {
        self.config
    }

    /// Execute an already parsed statement.
    pub async fn execute(&self, statement: Statement, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        match statement {
            Statement::Select(select) => self.select(select, params).await,
            Statement::Insert(insert) => self.insert(insert, params).await,
            Statement::Update(update) => self.update(update, params).await,
            Statement::Delete(delete) => self.delete(delete, params).await,
            Statement::CreateTable(create) => self.create_table(create).await,
            Statement::CreateIndex(index) => self.create_index(index).await,
            Statement::AlterTable(alter) => {
                tracing::info!("ALTER TABLE {} accepted without changes", alter.collection);
                Ok(QueryResult::empty(CommandTag::AlterTable))
            }
            Statement::Inert(kind) => {
                tracing::info!("{} accepted without changes", kind);
                Ok(QueryResult::empty(CommandTag::Inert))
            }
            Statement::Unsupported(text) => {
                if self.config.strict {
                    return Err(TranslationError::UnsupportedStatement(text));
                }
                tracing::warn!("Ignoring unsupported statement: {}", text);
                Ok(QueryResult::empty(CommandTag::Ignored))
            }
        }
    }

    async fn select(&self, select: Select, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let filter = build_filter(&select.predicates, params)?;

        let options = FindOptions {
            filter,
            projection: select.projection.iter().map(|f| to_store_case(f)).collect(),
            sort: select
                .order_by
                .map(|o| (to_store_case(&o.field), o.order)),
            skip: select.offset.map(u64::from),
            limit: select.limit.map(u64::from),
        };
        tracing::debug!("find {} where {}", select.collection, options.filter.to_document());

        let projection = options.projection.clone();
        let docs = self.store.find(&select.collection, options).await?;
        let rows = docs
            .into_iter()
            .map(|doc| shape_document(fill_missing(doc, &projection)))
            .collect();
        Ok(QueryResult::from_rows(CommandTag::Select, rows))
    }

    async fn insert(&self, insert: Insert, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let document: Document = build_assignments(&insert.fields, params)?.into_iter().collect();
        tracing::debug!("insert into {} ({} fields)", insert.collection, document.len());

        let outcome = self.store.insert_one(&insert.collection, document).await?;

        let rows = match &insert.returning {
            None => Vec::new(),
            Some(columns) if columns.is_empty() => vec![shape_document(outcome.document)],
            Some(columns) => {
                let projected = columns
                    .iter()
                    .map(|c| {
                        let field = to_store_case(c);
                        let value = outcome.document.get(&field).cloned().unwrap_or(TypedValue::Null);
                        (field, value)
                    })
                    .collect();
                vec![shape_document(projected)]
            }
        };

        Ok(QueryResult {
            rows,
            row_count: 1,
            command: CommandTag::Insert,
            inserted_id: Some(outcome.inserted_id),
        })
    }

    async fn update(&self, update: Update, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let set: Document = build_assignments(&update.assignments, params)?.into_iter().collect();
        let filter = build_filter(&update.predicates, params)?;
        tracing::debug!("update {} where {}", update.collection, filter.to_document());

        let outcome = self.store.update_many(&update.collection, filter, set).await?;
        Ok(QueryResult::affected(CommandTag::Update, outcome.modified.unwrap_or(0)))
    }

    async fn delete(&self, delete: Delete, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let filter = build_filter(&delete.predicates, params)?;
        tracing::debug!("delete from {} where {}", delete.collection, filter.to_document());

        let outcome = self.store.delete_many(&delete.collection, filter).await?;
        Ok(QueryResult::affected(CommandTag::Delete, outcome.deleted.unwrap_or(0)))
    }

    /// Collections come into being on their first write, so this only probes.
    async fn create_table(&self, create: CreateTable) -> TranslationResult<QueryResult> {
        let exists = self.store.collection_exists(&create.collection).await?;
        tracing::debug!("collection {} exists: {}", create.collection, exists);
        Ok(QueryResult::empty(CommandTag::CreateTable))
    }

    async fn create_index(&self, index: CreateIndex) -> TranslationResult<QueryResult> {
        let spec = IndexSpec {
            name: index.index_name,
            keys: index.fields.iter().map(|f| to_store_case(f)).collect(),
            unique: index.unique,
        };
        tracing::debug!("create index {} on {}", spec.name, index.collection);

        match self.store.create_index(&index.collection, spec).await {
            Ok(()) => {}
            Err(StoreError::IndexAlreadyExists(name)) => {
                tracing::debug!("index {} already exists", name);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(QueryResult::empty(CommandTag::CreateIndex))
    }
}

#[async_trait]
impl<S: DocumentStore> QueryInterface for Translator<S> {
    async fn query(&self, text: &str, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let statement = parser::parse(text)?;
        tracing::debug!("{} statement on {:?}", statement.kind(), statement.collection());
        self.execute(statement, params).await
    }
}
