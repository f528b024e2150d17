//! Predicate translator: renders parsed predicates into document-store filters.
//!
//! | SQL predicate        | Filter fragment                                  |
//! |----------------------|--------------------------------------------------|
//! | `f = v`              | `{ "f": v }`                                     |
//! | `f != v`             | `{ "f": { "$ne": v } }`                          |
//! | `f <= v` / `>=` ...  | `{ "f": { "$lte": v } }` / `$gte` / `$lt` / `$gt` |
//! | `f IS NULL`          | `{ "f": null }`                                  |
//! | `f IS NOT NULL`      | `{ "f": { "$ne": null } }`                       |
//! | `f LIKE 'a%'`        | `{ "f": { "$regex": "^a.*$", "$options": "is" } }` |
//!
//! Field names are converted to store case on the way through.

use serde_json::{json, Map, Value as Json};

use crate::ast::{CompareOp, Predicate, SortOrder};
use crate::case::to_store_case;
use crate::error::TranslationResult;
use crate::value::{TypedValue, ValueSource};

/// Operator of one filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Case-insensitive, anchored regular expression; the value is the pattern.
    Regex,
}

impl FilterOp {
    pub fn as_mongo(self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Regex => "$regex",
        }
    }
}

/// A single `field op value` test against store-case field names.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: TypedValue,
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as a MongoDB query document. Several conditions on one field
    /// share an operator object; equality then becomes `$eq`.
    pub fn to_document(&self) -> Json {
        let mut doc = Map::new();

        for cond in &self.conditions {
            let rendered = value_to_json(&cond.value);
            let entry = doc.remove(&cond.field);

            let merged = match (entry, cond.op) {
                (None, FilterOp::Eq) => rendered,
                (None, op) => operator_object(op, rendered),
                (Some(Json::Object(mut ops)), op) if is_operator_object(&ops) => {
                    insert_op(&mut ops, op, rendered);
                    Json::Object(ops)
                }
                (Some(previous), op) => {
                    let mut ops = Map::new();
                    ops.insert("$eq".to_string(), previous);
                    insert_op(&mut ops, op, rendered);
                    Json::Object(ops)
                }
            };
            doc.insert(cond.field.clone(), merged);
        }

        Json::Object(doc)
    }
}

fn operator_object(op: FilterOp, value: Json) -> Json {
    let mut ops = Map::new();
    insert_op(&mut ops, op, value);
    Json::Object(ops)
}

fn insert_op(ops: &mut Map<String, Json>, op: FilterOp, value: Json) {
    ops.insert(op.as_mongo().to_string(), value);
    if op == FilterOp::Regex {
        ops.insert("$options".to_string(), json!("is"));
    }
}

fn is_operator_object(map: &Map<String, Json>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

/// JSON form of a value inside a filter document.
pub fn value_to_json(v: &TypedValue) -> Json {
    match v {
        TypedValue::Timestamp(t) => json!({ "$date": TypedValue::Timestamp(*t).to_string() }),
        other => serde_json::to_value(other).unwrap_or(Json::Null),
    }
}

/// Translate a SQL `LIKE` pattern into an anchored regular expression:
/// `%` matches any run of characters, `_` exactly one, everything else literally.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    let mut literal = String::new();

    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if c == '%' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

/// Build the store filter for a WHERE clause, resolving `$n` against `params`.
pub fn build_filter(predicates: &[Predicate], params: &[TypedValue]) -> TranslationResult<Filter> {
    let mut conditions = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        let field = to_store_case(predicate.field());
        let resolved = match predicate.value() {
            Some(source) => source.resolve(params)?,
            None => TypedValue::Null,
        };

        let (op, value) = match predicate.op() {
            CompareOp::Eq => (FilterOp::Eq, resolved),
            CompareOp::Ne => (FilterOp::Ne, resolved),
            CompareOp::Lt => (FilterOp::Lt, resolved),
            CompareOp::Lte => (FilterOp::Lte, resolved),
            CompareOp::Gt => (FilterOp::Gt, resolved),
            CompareOp::Gte => (FilterOp::Gte, resolved),
            CompareOp::IsNull => (FilterOp::Eq, TypedValue::Null),
            CompareOp::IsNotNull => (FilterOp::Ne, TypedValue::Null),
            CompareOp::Like => {
                let pattern = match &resolved {
                    TypedValue::Text(s) => s.clone(),
                    other => other.to_string(),
                };
                (FilterOp::Regex, TypedValue::Text(like_to_regex(&pattern)))
            }
        };

        conditions.push(Condition { field, op, value });
    }

    Ok(Filter { conditions })
}

/// Resolve `field = value` pairs into a store-case document body.
pub fn build_assignments(
    pairs: &[(String, ValueSource)],
    params: &[TypedValue],
) -> TranslationResult<Vec<(String, TypedValue)>> {
    pairs
        .iter()
        .map(|(field, source)| Ok((to_store_case(field), source.resolve(params)?)))
        .collect()
}

/// `1` ascending, `-1` descending.
pub fn sort_direction(order: SortOrder) -> i32 {
    match order {
        SortOrder::Asc => 1,
        SortOrder::Desc => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::ast::Statement;
    use pretty_assertions::assert_eq;

    fn where_of(sql: &str) -> Vec<Predicate> {
        match parse(sql).unwrap() {
            Statement::Select(s) => s.predicates,
            Statement::Delete(d) => d.predicates,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_like_to_regex() {
        assert_eq!(like_to_regex("ab%"), "^ab.*$");
        assert_eq!(like_to_regex("a_c"), "^a.c$");
        assert_eq!(like_to_regex("%.com"), "^.*\\.com$");
        assert_eq!(like_to_regex("100%"), "^100.*$");
    }

    #[test]
    fn test_filter_equality_and_ranges() {
        let preds = where_of("SELECT * FROM users WHERE email = $1 AND login_count >= $2 AND login_count < 10");
        let params = vec![TypedValue::from("alice@example.com"), TypedValue::from(3)];
        let filter = build_filter(&preds, &params).unwrap();

        assert_eq!(
            filter.to_document(),
            json!({
                "email": "alice@example.com",
                "loginCount": { "$gte": 3, "$lt": 10 }
            })
        );
    }

    #[test]
    fn test_filter_null_tests() {
        let preds = where_of("SELECT * FROM users WHERE deleted_at IS NULL AND telegram_id IS NOT NULL");
        let filter = build_filter(&preds, &[]).unwrap();
        assert_eq!(
            filter.to_document(),
            json!({ "deletedAt": null, "telegramId": { "$ne": null } })
        );
    }

    #[test]
    fn test_filter_like() {
        let preds = where_of("SELECT * FROM users WHERE name LIKE 'ab%'");
        let filter = build_filter(&preds, &[]).unwrap();
        assert_eq!(
            filter.to_document(),
            json!({ "name": { "$regex": "^ab.*$", "$options": "is" } })
        );
    }

    #[test]
    fn test_filter_eq_merged_with_range() {
        let preds = where_of("DELETE FROM t WHERE n = 5 AND n != 6");
        let filter = build_filter(&preds, &[]).unwrap();
        assert_eq!(filter.to_document(), json!({ "n": { "$eq": 5, "$ne": 6 } }));
    }

    #[test]
    fn test_filter_param_out_of_range() {
        let preds = where_of("SELECT * FROM users WHERE id = $2");
        let err = build_filter(&preds, &[TypedValue::from(1)]).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_assignments_store_case() {
        let pairs = vec![("updated_at".to_string(), ValueSource::Param(1))];
        let doc = build_assignments(&pairs, &[TypedValue::from("x")]).unwrap();
        assert_eq!(doc, vec![("updatedAt".to_string(), TypedValue::from("x"))]);
    }
}
