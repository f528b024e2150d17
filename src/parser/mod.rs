//! SQL statement classifier and parsers.
//!
//! Parses the supported SQL subset into a [`Statement`].
//!
//! # Supported statements
//!
//! ```text
//! SELECT <cols|*> FROM <name> [WHERE ...] [ORDER BY <f> [ASC|DESC]] [LIMIT <n>] [OFFSET <n>]
//! INSERT INTO <name> (<cols>) VALUES (<vals>) [RETURNING <cols|*>]
//! UPDATE <name> SET <f = v, ...> [WHERE ...]
//! DELETE FROM <name> [WHERE ...]
//! CREATE TABLE [IF NOT EXISTS] <name> (...)
//! CREATE [UNIQUE] INDEX [IF NOT EXISTS] <index> ON <name> (<cols>)
//! ALTER TABLE <name> ...
//! ```
//!
//! `DO` blocks and transaction control are classified as inert. Anything else
//! is [`Statement::Unsupported`], which is a result, not an error.

pub mod predicates;
pub mod statements;
pub mod tokens;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::error::TranslationResult;
use tokens::word;

/// Identify a statement from its leading keyword(s). Never fails.
pub fn classify(text: &str) -> StatementKind {
    let mut words = Vec::with_capacity(3);
    let mut input = text;
    while words.len() < 3 {
        match word(input) {
            Ok((rest, w)) => {
                words.push(w.to_ascii_lowercase());
                input = rest;
            }
            Err(_) => break,
        }
    }

    let first = words.first().map(String::as_str).unwrap_or("");
    let second = words.get(1).map(String::as_str).unwrap_or("");
    let third = words.get(2).map(String::as_str).unwrap_or("");

    match first {
        "select" => StatementKind::Select,
        "insert" => StatementKind::Insert,
        "update" => StatementKind::Update,
        "delete" => StatementKind::Delete,
        "create" => match (second, third) {
            ("table", _) => StatementKind::CreateTable,
            ("index", _) | ("unique", "index") => StatementKind::CreateIndex,
            _ => StatementKind::Unsupported,
        },
        "alter" if second == "table" => StatementKind::AlterTable,
        "do" => StatementKind::Inert(InertKind::Block),
        "begin" => StatementKind::Inert(InertKind::Begin),
        "start" if second == "transaction" => StatementKind::Inert(InertKind::Begin),
        "commit" | "end" => StatementKind::Inert(InertKind::Commit),
        "rollback" | "abort" => StatementKind::Inert(InertKind::Rollback),
        _ => StatementKind::Unsupported,
    }
}

/// Parse statement text into a [`Statement`].
///
/// Fails only when a recognized statement is malformed.
///
/// # Example
///
/// ```
/// use sqlshim::parser::parse;
/// use sqlshim::ast::Statement;
///
/// let stmt = parse("SELECT id, name FROM users WHERE email = $1").unwrap();
/// assert_eq!(stmt.collection(), Some("users"));
///
/// let stmt = parse("VACUUM users").unwrap();
/// assert!(matches!(stmt, Statement::Unsupported(_)));
/// ```
pub fn parse(text: &str) -> TranslationResult<Statement> {
    let text = text.trim();

    let statement = match classify(text) {
        StatementKind::Select => Statement::Select(statements::parse_select(text)?),
        StatementKind::Insert => Statement::Insert(statements::parse_insert(text)?),
        StatementKind::Update => Statement::Update(statements::parse_update(text)?),
        StatementKind::Delete => Statement::Delete(statements::parse_delete(text)?),
        StatementKind::CreateTable => {
            Statement::CreateTable(statements::parse_create_table(text)?)
        }
        StatementKind::CreateIndex => {
            Statement::CreateIndex(statements::parse_create_index(text)?)
        }
        StatementKind::AlterTable => Statement::AlterTable(statements::parse_alter_table(text)?),
        StatementKind::Inert(kind) => Statement::Inert(kind),
        StatementKind::Unsupported => Statement::Unsupported(text.to_string()),
    };

    Ok(statement)
}
