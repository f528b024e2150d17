//! PostgreSQL pass-through.
//!
//! [`PgBackend`] runs statement text unchanged on a caller-owned pool and
//! returns the same dual-key rows as the document translator, so callers can
//! switch stores without touching their queries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use uuid::Uuid;

use crate::ast::StatementKind;
use crate::engine::{CommandTag, QueryInterface, QueryResult};
use crate::error::{TranslationError, TranslationResult};
use crate::parser::classify;
use crate::row::{shape_columns, Row};
use crate::store::StoreError;
use crate::value::TypedValue;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `duplicate_table`, raised for an existing index name.
const DUPLICATE_TABLE: &str = "42P07";

/// Relational backend over an already-open PostgreSQL pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool, for callers without one of their own.
    pub async fn connect(url: &str) -> TranslationResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(backend_error)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn command_tag(kind: StatementKind) -> CommandTag {
    match kind {
        StatementKind::Select => CommandTag::Select,
        StatementKind::Insert => CommandTag::Insert,
        StatementKind::Update => CommandTag::Update,
        StatementKind::Delete => CommandTag::Delete,
        StatementKind::CreateTable => CommandTag::CreateTable,
        StatementKind::CreateIndex => CommandTag::CreateIndex,
        StatementKind::AlterTable => CommandTag::AlterTable,
        StatementKind::Inert(_) => CommandTag::Inert,
        StatementKind::Unsupported => CommandTag::Passthrough,
    }
}

/// Whether the statement hands rows back.
fn returns_rows(kind: StatementKind, text: &str) -> bool {
    match kind {
        StatementKind::Select => true,
        StatementKind::Insert | StatementKind::Update | StatementKind::Delete => text
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|word| word.eq_ignore_ascii_case("returning")),
        _ => false,
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &TypedValue) -> PgQuery<'q> {
    match value {
        // Untyped NULL has no Rust counterpart; sent as a text NULL.
        TypedValue::Null => query.bind(Option::<String>::None),
        TypedValue::Bool(b) => query.bind(*b),
        TypedValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            query.bind(*n as i64)
        }
        TypedValue::Number(n) => query.bind(*n),
        TypedValue::Text(s) => query.bind(s.clone()),
        TypedValue::Timestamp(t) => query.bind(*t),
        TypedValue::GeneratedId(id) => query.bind(*id),
    }
}

fn backend_error(e: sqlx::Error) -> TranslationError {
    TranslationError::Store(StoreError::Backend(e.to_string()))
}

fn store_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return StoreError::DuplicateKey {
                    collection: db.table().unwrap_or_default().to_string(),
                    index: db.constraint().unwrap_or_default().to_string(),
                };
            }
            Some(DUPLICATE_TABLE) => {
                return StoreError::IndexAlreadyExists(db.message().to_string());
            }
            _ => {}
        }
    }
    StoreError::Backend(e.to_string())
}

/// Decode a row by column type name. Unreadable values become NULL.
fn row_to_map(row: &PgRow) -> BTreeMap<String, TypedValue> {
    let mut map = BTreeMap::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();

        let value: TypedValue = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(i).ok().flatten().into(),
            "INT2" => row.try_get::<Option<i16>, _>(i).ok().flatten().map(i64::from).into(),
            "INT4" => row.try_get::<Option<i32>, _>(i).ok().flatten().map(i64::from).into(),
            "INT8" => row.try_get::<Option<i64>, _>(i).ok().flatten().into(),
            "FLOAT4" => row.try_get::<Option<f32>, _>(i).ok().flatten().map(f64::from).into(),
            "FLOAT8" => row.try_get::<Option<f64>, _>(i).ok().flatten().into(),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(i)
                .ok()
                .flatten()
                .into(),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)
                .ok()
                .flatten()
                .map(|t| t.and_utc())
                .into(),
            "UUID" => row.try_get::<Option<Uuid>, _>(i).ok().flatten().into(),
            _ => row.try_get::<Option<String>, _>(i).ok().flatten().into(),
        };

        map.insert(name, value);
    }

    map
}

#[async_trait]
impl QueryInterface for PgBackend {
    async fn query(&self, text: &str, params: &[TypedValue]) -> TranslationResult<QueryResult> {
        let kind = classify(text);
        let command = command_tag(kind);
        tracing::debug!("{} passed through to postgres ({} params)", kind, params.len());

        let mut query = sqlx::query(text);
        for param in params {
            query = bind_value(query, param);
        }

        if returns_rows(kind, text) {
            let rows: Vec<PgRow> = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| TranslationError::Store(store_error(e)))?;
            let rows: Vec<Row> = rows.iter().map(|r| shape_columns(row_to_map(r))).collect();

            let mut result = QueryResult::from_rows(command, rows);
            if kind == StatementKind::Insert {
                result.inserted_id = result
                    .rows
                    .first()
                    .and_then(|r| r.get("id").or_else(|| r.get("_id")))
                    .cloned();
            }
            return Ok(result);
        }

        match query.execute(&self.pool).await {
            Ok(done) => {
                let affected = match kind {
                    StatementKind::Insert | StatementKind::Update | StatementKind::Delete => {
                        done.rows_affected()
                    }
                    _ => 0,
                };
                Ok(QueryResult::affected(command, affected))
            }
            Err(e) => match store_error(e) {
                StoreError::IndexAlreadyExists(msg) if kind == StatementKind::CreateIndex => {
                    tracing::debug!("index already exists: {}", msg);
                    Ok(QueryResult::empty(command))
                }
                other => Err(other.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tag() {
        assert_eq!(command_tag(classify("SELECT 1")), CommandTag::Select);
        assert_eq!(command_tag(classify("COMMIT")), CommandTag::Inert);
        assert_eq!(command_tag(classify("VACUUM users")), CommandTag::Passthrough);
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows(StatementKind::Select, "SELECT * FROM t"));
        assert!(returns_rows(
            StatementKind::Insert,
            "INSERT INTO t (a) VALUES ($1) RETURNING id"
        ));
        assert!(!returns_rows(StatementKind::Insert, "INSERT INTO t (a) VALUES ($1)"));
        assert!(!returns_rows(StatementKind::CreateTable, "CREATE TABLE t (returning_at int)"));
        assert!(!returns_rows(
            StatementKind::Insert,
            "INSERT INTO users (returning_user) VALUES ($1)"
        ));
        assert!(returns_rows(
            StatementKind::Delete,
            "DELETE FROM t WHERE id = $1\nreturning\tid"
        ));
    }
}
