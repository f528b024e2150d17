//! One parser per statement kind.
//!
//! Each parser takes the full (trimmed) statement text so errors can report
//! absolute positions. Mandatory pieces go through [`expect`]; optional
//! clauses through [`maybe`].

use super::predicates::where_clause;
use super::tokens::{
    balanced_parens, end_of_statement, error_at, expect, identifier, keyword, keywords, maybe,
    paren_identifier_list, paren_value_list, projection, symbol, unsigned,
};
use crate::ast::*;
use crate::error::TranslationResult;
use crate::value::ValueSource;

/// `SELECT <cols|*> FROM <name> [WHERE ...] [ORDER BY f [ASC|DESC]] [LIMIT n] [OFFSET n]`
pub fn parse_select(full: &str) -> TranslationResult<Select> {
    let (input, _) = expect(full, full, keyword("select"), "SELECT")?;
    let (input, projection) = expect(full, input, projection, "column list or *")?;
    let (input, _) = expect(full, input, keyword("from"), "FROM")?;
    let (input, collection) = expect(full, input, identifier, "collection name after FROM")?;
    let (input, predicates) = where_clause(full, input)?;

    let (mut input, order_kw) = maybe(input, keywords(&["order", "by"]));
    let mut order_by = None;
    if order_kw.is_some() {
        let (rest, field) = expect(full, input, identifier, "field after ORDER BY")?;
        let (rest, order) = sort_order(rest);
        order_by = Some(OrderBy { field, order });
        input = rest;
    }

    // LIMIT and OFFSET are accepted in either order.
    let mut limit = None;
    let mut offset = None;
    loop {
        if limit.is_none() {
            if let (rest, Some(_)) = maybe(input, keyword("limit")) {
                let (rest, n) = expect(full, rest, unsigned, "row count after LIMIT")?;
                limit = Some(n);
                input = rest;
                continue;
            }
        }
        if offset.is_none() {
            if let (rest, Some(_)) = maybe(input, keyword("offset")) {
                let (rest, n) = expect(full, rest, unsigned, "row count after OFFSET")?;
                offset = Some(n);
                input = rest;
                continue;
            }
        }
        break;
    }

    end_of_statement(full, input)?;

    Ok(Select {
        collection,
        projection,
        predicates,
        order_by,
        limit,
        offset,
    })
}

fn sort_order(input: &str) -> (&str, SortOrder) {
    if let (rest, Some(_)) = maybe(input, keyword("desc")) {
        return (rest, SortOrder::Desc);
    }
    let (rest, _) = maybe(input, keyword("asc"));
    (rest, SortOrder::Asc)
}

/// `INSERT INTO <name> (<cols>) VALUES (<vals>) [RETURNING <cols|*>]`
pub fn parse_insert(full: &str) -> TranslationResult<Insert> {
    let (input, _) = expect(full, full, keywords(&["insert", "into"]), "INSERT INTO")?;
    let (input, collection) = expect(full, input, identifier, "collection name after INTO")?;
    let (input, columns) = expect(full, input, paren_identifier_list, "column list")?;
    let (input, _) = expect(full, input, keyword("values"), "VALUES")?;
    let values_at = input;
    let (input, values) = expect(full, input, paren_value_list, "value list")?;

    if columns.len() != values.len() {
        return Err(error_at(
            full,
            values_at,
            format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            ),
        ));
    }

    let (mut input, returning_kw) = maybe(input, keyword("returning"));
    let mut returning = None;
    if returning_kw.is_some() {
        let (rest, cols) = expect(full, input, projection, "column list or * after RETURNING")?;
        returning = Some(cols);
        input = rest;
    }

    end_of_statement(full, input)?;

    Ok(Insert {
        collection,
        fields: columns.into_iter().zip(values).collect(),
        returning,
    })
}

/// `UPDATE <name> SET f = v, ... [WHERE ...]`
pub fn parse_update(full: &str) -> TranslationResult<Update> {
    let (input, _) = expect(full, full, keyword("update"), "UPDATE")?;
    let (input, collection) = expect(full, input, identifier, "collection name after UPDATE")?;
    let (mut input, _) = expect(full, input, keyword("set"), "SET")?;

    let mut assignments = Vec::new();
    loop {
        let (rest, pair) = expect(full, input, assignment, "field = value assignment")?;
        assignments.push(pair);
        input = rest;
        match maybe(input, symbol(",")) {
            (rest, Some(_)) => input = rest,
            (_, None) => break,
        }
    }

    let (input, predicates) = where_clause(full, input)?;
    end_of_statement(full, input)?;

    Ok(Update {
        collection,
        assignments,
        predicates,
    })
}

fn assignment(input: &str) -> nom::IResult<&str, (String, ValueSource)> {
    let (input, field) = identifier(input)?;
    let (input, _) = symbol("=")(input)?;
    let (input, value) = super::tokens::value_token(input)?;
    Ok((input, (field, value)))
}

/// `DELETE FROM <name> [WHERE ...]`
pub fn parse_delete(full: &str) -> TranslationResult<Delete> {
    let (input, _) = expect(full, full, keywords(&["delete", "from"]), "DELETE FROM")?;
    let (input, collection) = expect(full, input, identifier, "collection name after FROM")?;
    let (input, predicates) = where_clause(full, input)?;
    end_of_statement(full, input)?;

    Ok(Delete {
        collection,
        predicates,
    })
}

/// `CREATE TABLE [IF NOT EXISTS] <name> (...)`
///
/// Column definitions are skipped; a document store has nothing to apply them to.
/// Table options after the closing parenthesis are not accepted.
pub fn parse_create_table(full: &str) -> TranslationResult<CreateTable> {
    let (input, _) = expect(full, full, keywords(&["create", "table"]), "CREATE TABLE")?;
    let (input, if_not_exists) = maybe(input, keywords(&["if", "not", "exists"]));
    let (input, collection) = expect(full, input, identifier, "collection name after TABLE")?;
    let (input, _) = maybe(input, balanced_parens);
    end_of_statement(full, input)?;

    Ok(CreateTable {
        collection,
        if_not_exists: if_not_exists.is_some(),
    })
}

/// `CREATE [UNIQUE] INDEX [IF NOT EXISTS] [<indexName>] ON <name> [USING m] (<cols>)`
///
/// Without a name the index is called `<collection>_<fields>_idx`.
pub fn parse_create_index(full: &str) -> TranslationResult<CreateIndex> {
    let (input, _) = expect(full, full, keyword("create"), "CREATE")?;
    let (input, unique) = maybe(input, keyword("unique"));
    let (input, _) = expect(full, input, keyword("index"), "INDEX")?;
    let (input, if_not_exists) = maybe(input, keywords(&["if", "not", "exists"]));
    let (input, index_name) = maybe(input, identifier);
    let (input, _) = expect(full, input, keyword("on"), "ON")?;
    let (input, collection) = expect(full, input, identifier, "collection name after ON")?;
    let (input, _) = maybe(input, |i| {
        let (i, _) = keyword("using")(i)?;
        identifier(i)
    });
    let (input, fields) = expect(full, input, index_columns, "indexed column list")?;
    end_of_statement(full, input)?;

    let index_name =
        index_name.unwrap_or_else(|| format!("{}_{}_idx", collection, fields.join("_")));

    Ok(CreateIndex {
        index_name,
        collection,
        fields,
        unique: unique.is_some(),
        if_not_exists: if_not_exists.is_some(),
    })
}

/// `(a, b DESC)`; per-column direction is accepted and dropped.
fn index_columns(input: &str) -> nom::IResult<&str, Vec<String>> {
    let (mut input, _) = symbol("(")(input)?;
    let mut fields = Vec::new();
    loop {
        let (rest, field) = identifier(input)?;
        let (rest, _) = sort_order(rest);
        fields.push(field);
        match symbol(",")(rest) {
            Ok((rest, _)) => input = rest,
            Err(_) => {
                let (rest, _) = symbol(")")(rest)?;
                return Ok((rest, fields));
            }
        }
    }
}

/// `ALTER TABLE [IF EXISTS] <name> ...`; everything after the name is ignored.
pub fn parse_alter_table(full: &str) -> TranslationResult<AlterTable> {
    let (input, _) = expect(full, full, keywords(&["alter", "table"]), "ALTER TABLE")?;
    let (input, _) = maybe(input, keywords(&["if", "exists"]));
    let (input, _) = maybe(input, keyword("only"));
    let (_, collection) = expect(full, input, identifier, "collection name after TABLE")?;

    Ok(AlterTable { collection })
}
