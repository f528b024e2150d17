//! # sqlshim: SQL on a document store
//!
//! Application code keeps issuing parameterized SQL; sqlshim classifies each
//! statement, translates it into one document-store operation and hands back
//! rows keyed by both snake_case and camelCase field names.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlshim::prelude::*;
//!
//! let db = Translator::new(Arc::new(MemoryStore::new()));
//! db.query("INSERT INTO users (email, created_at) VALUES ($1, NOW())", &["a@b.io".into()]).await?;
//!
//! let result = db.query("SELECT * FROM users WHERE email = $1", &["a@b.io".into()]).await?;
//! assert!(result.rows[0].get("created_at").is_some());
//! ```
//!
//! ## Translation
//!
//! | SQL                        | Store operation                      |
//! |----------------------------|--------------------------------------|
//! | `SELECT`                   | `find`                               |
//! | `INSERT`                   | `insertOne`                          |
//! | `UPDATE ... SET`           | `updateMany` with `$set`             |
//! | `DELETE`                   | `deleteMany`                         |
//! | `CREATE TABLE`             | presence probe only                  |
//! | `CREATE [UNIQUE] INDEX`    | `createIndex`, existing name is fine |
//! | `ALTER TABLE`, `DO`, `BEGIN` | nothing                            |
//!
//! Anything else comes back empty and tagged ignored, or fails in strict mode.

pub mod ast;
pub mod case;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod relational;
pub mod row;
pub mod store;
pub mod transpiler;
pub mod value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::Config;
    pub use crate::engine::{CommandTag, QueryInterface, QueryResult, Translator, TranslatorConfig};
    pub use crate::error::*;
    pub use crate::parser::{classify, parse};
    pub use crate::relational::PgBackend;
    pub use crate::row::Row;
    pub use crate::store::{DocumentStore, MemoryStore, StoreError};
    pub use crate::value::TypedValue;
}

/// Parse one SQL statement.
///
/// # Example
///
/// ```
/// use sqlshim::parse;
///
/// let stmt = parse("SELECT * FROM users WHERE verified = true").unwrap();
/// assert_eq!(stmt.collection(), Some("users"));
/// ```
pub fn parse(input: &str) -> Result<ast::Statement, error::TranslationError> {
    parser::parse(input)
}
