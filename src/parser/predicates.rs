//! WHERE clause grammar: an AND-only conjunction of atomic comparisons.
//!
//! ```text
//! where     := WHERE condition (AND condition)*
//! condition := field IS NOT NULL
//!            | field IS NULL
//!            | field (LIKE | ILIKE) ('pattern' | $n)
//!            | field (= | != | <> | <= | >= | < | >) value
//! ```
//!
//! `OR` and parenthesized groups are rejected with their own error rather
//! than parsed as something else.

use nom::{
    branch::alt,
    combinator::{map, value},
    sequence::{pair, preceded},
    IResult,
};

use super::tokens::{
    error_at, identifier, keyword, keywords, maybe, param, string_literal, symbol, value_token,
};
use crate::ast::{CompareOp, Predicate};
use crate::error::TranslationResult;
use crate::value::{TypedValue, ValueSource};

#[derive(Debug, Clone)]
enum Tail {
    Null { negated: bool },
    Compare(CompareOp, ValueSource),
}

/// Two-character operators come first so `<=` is never read as `<`.
fn comparison_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Ne, symbol("!=")),
        value(CompareOp::Ne, symbol("<>")),
        value(CompareOp::Lte, symbol("<=")),
        value(CompareOp::Gte, symbol(">=")),
        value(CompareOp::Lt, symbol("<")),
        value(CompareOp::Gt, symbol(">")),
        value(CompareOp::Eq, symbol("=")),
    ))(input)
}

fn like_operand(input: &str) -> IResult<&str, ValueSource> {
    alt((
        map(string_literal, |s| ValueSource::Literal(TypedValue::Text(s))),
        map(param, ValueSource::Param),
    ))(input)
}

/// One atomic condition.
pub fn condition(input: &str) -> IResult<&str, Predicate> {
    let (input, field) = identifier(input)?;
    let (input, tail) = alt((
        value(Tail::Null { negated: true }, keywords(&["is", "not", "null"])),
        value(Tail::Null { negated: false }, keywords(&["is", "null"])),
        map(
            preceded(alt((keyword("like"), keyword("ilike"))), like_operand),
            |v| Tail::Compare(CompareOp::Like, v),
        ),
        map(pair(comparison_op, value_token), |(op, v)| {
            Tail::Compare(op, v)
        }),
    ))(input)?;

    let predicate = match tail {
        Tail::Null { negated } => Predicate::unary(field, negated),
        Tail::Compare(op, v) => Predicate::compare(field, op, v),
    };
    Ok((input, predicate))
}

/// Parse an optional WHERE clause. Absent means no predicates; present but
/// empty or containing an unrecognized condition is an error.
pub fn where_clause<'a>(full: &str, input: &'a str) -> TranslationResult<(&'a str, Vec<Predicate>)> {
    let (mut input, found) = maybe(input, keyword("where"));
    if found.is_none() {
        return Ok((input, Vec::new()));
    }

    let mut predicates = Vec::new();
    loop {
        let (rest, predicate) = condition(input).map_err(|_| {
            if maybe(input, symbol("(")).1.is_some() {
                error_at(full, input, "grouped predicates are not supported".to_string())
            } else if predicates.is_empty() && at_clause_boundary(input) {
                error_at(full, input, "empty WHERE clause".to_string())
            } else {
                error_at(full, input, "unrecognized condition in WHERE clause".to_string())
            }
        })?;
        predicates.push(predicate);
        input = rest;

        if let (rest, Some(_)) = maybe(input, keyword("and")) {
            input = rest;
            continue;
        }
        if maybe(input, keyword("or")).1.is_some() {
            return Err(error_at(
                full,
                input,
                "OR is not supported, only AND-combined conditions".to_string(),
            ));
        }
        break;
    }

    Ok((input, predicates))
}

fn at_clause_boundary(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.is_empty()
        || trimmed == ";"
        || maybe(input, keywords(&["order", "by"])).1.is_some()
        || maybe(input, keyword("limit")).1.is_some()
        || maybe(input, keyword("offset")).1.is_some()
        || maybe(input, keyword("returning")).1.is_some()
}
