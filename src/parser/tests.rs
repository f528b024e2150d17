use pretty_assertions::assert_eq;

use super::*;
use crate::value::{TypedValue, ValueSource};

fn text(s: &str) -> ValueSource {
    ValueSource::Literal(TypedValue::Text(s.to_string()))
}

#[test]
fn test_classify_keywords() {
    assert_eq!(classify("  select * from t"), StatementKind::Select);
    assert_eq!(classify("Insert into t (a) values (1)"), StatementKind::Insert);
    assert_eq!(classify("UPDATE t SET a = 1"), StatementKind::Update);
    assert_eq!(classify("delete from t"), StatementKind::Delete);
    assert_eq!(classify("CREATE TABLE t (id TEXT)"), StatementKind::CreateTable);
    assert_eq!(classify("create unique index i on t (a)"), StatementKind::CreateIndex);
    assert_eq!(classify("CREATE INDEX i ON t (a)"), StatementKind::CreateIndex);
    assert_eq!(classify("ALTER TABLE t ADD COLUMN b TEXT"), StatementKind::AlterTable);
    assert_eq!(classify("-- seed\nSELECT * FROM t"), StatementKind::Select);
}

#[test]
fn test_classify_inert_and_unsupported() {
    assert_eq!(
        classify("DO $$ BEGIN RAISE NOTICE 'x'; END $$"),
        StatementKind::Inert(InertKind::Block)
    );
    assert_eq!(classify("BEGIN"), StatementKind::Inert(InertKind::Begin));
    assert_eq!(classify("start transaction"), StatementKind::Inert(InertKind::Begin));
    assert_eq!(classify("COMMIT;"), StatementKind::Inert(InertKind::Commit));
    assert_eq!(classify("ROLLBACK"), StatementKind::Inert(InertKind::Rollback));
    assert_eq!(classify("CREATE EXTENSION pgcrypto"), StatementKind::Unsupported);
    assert_eq!(classify("ALTER SEQUENCE s RESTART"), StatementKind::Unsupported);
    assert_eq!(classify("SELEKT * FROM users"), StatementKind::Unsupported);
    assert_eq!(classify(""), StatementKind::Unsupported);
}

#[test]
fn test_parse_unsupported_keeps_text() {
    let stmt = parse("  VACUUM ANALYZE users  ").unwrap();
    assert_eq!(stmt, Statement::Unsupported("VACUUM ANALYZE users".to_string()));
}

#[test]
fn test_select_full() {
    let stmt = parse(
        "SELECT id, name FROM users WHERE email = $1 AND age >= 18 ORDER BY created_at DESC LIMIT 10 OFFSET 20;",
    )
    .unwrap();

    let Statement::Select(select) = stmt else {
        panic!("expected select");
    };
    assert_eq!(select.collection, "users");
    assert_eq!(select.projection, vec!["id".to_string(), "name".to_string()]);
    assert_eq!(
        select.predicates,
        vec![
            Predicate::compare("email", CompareOp::Eq, ValueSource::Param(1)),
            Predicate::compare(
                "age",
                CompareOp::Gte,
                ValueSource::Literal(TypedValue::Number(18.0))
            ),
        ]
    );
    assert_eq!(
        select.order_by,
        Some(OrderBy {
            field: "created_at".to_string(),
            order: SortOrder::Desc
        })
    );
    assert_eq!(select.limit, Some(10));
    assert_eq!(select.offset, Some(20));
}

#[test]
fn test_select_star_minimal() {
    let Statement::Select(select) = parse("select * from sessions").unwrap() else {
        panic!("expected select");
    };
    assert!(select.projection.is_empty());
    assert!(select.predicates.is_empty());
    assert_eq!(select.order_by, None);
    assert_eq!(select.limit, None);
}

#[test]
fn test_select_order_default_asc() {
    let Statement::Select(select) = parse("SELECT * FROM t ORDER BY score").unwrap() else {
        panic!("expected select");
    };
    assert_eq!(select.order_by.unwrap().order, SortOrder::Asc);
}

#[test]
fn test_select_missing_collection() {
    let err = parse("SELECT * FROM").unwrap_err();
    assert!(err.is_parse_error());
    assert!(err.to_string().contains("collection name after FROM"));

    let err = parse("SELECT * FROM WHERE a = 1").unwrap_err();
    assert!(err.to_string().contains("position 14"));
}

#[test]
fn test_select_trailing_garbage() {
    let err = parse("SELECT * FROM users GROUP BY role").unwrap_err();
    assert!(err.to_string().contains("unexpected trailing content"));
}

#[test]
fn test_select_where_unrecognized() {
    let err = parse("SELECT * FROM users WHERE lower(email) = $1").unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_insert() {
    let stmt = parse(
        "INSERT INTO users (id, name, email, created_at, verified) VALUES (gen_random_uuid(), $1, 'o''neil@example.com', NOW(), false)",
    )
    .unwrap();

    let Statement::Insert(insert) = stmt else {
        panic!("expected insert");
    };
    assert_eq!(insert.collection, "users");
    let names: Vec<&str> = insert.fields.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email", "created_at", "verified"]);
    assert!(matches!(
        insert.fields[0].1,
        ValueSource::Literal(TypedValue::GeneratedId(_))
    ));
    assert_eq!(insert.fields[1].1, ValueSource::Param(1));
    assert_eq!(insert.fields[2].1, text("o'neil@example.com"));
    assert!(matches!(
        insert.fields[3].1,
        ValueSource::Literal(TypedValue::Timestamp(_))
    ));
    assert_eq!(
        insert.fields[4].1,
        ValueSource::Literal(TypedValue::Bool(false))
    );
    assert_eq!(insert.returning, None);
}

#[test]
fn test_insert_returning() {
    let Statement::Insert(insert) =
        parse("INSERT INTO users (name) VALUES ($1) RETURNING id, name").unwrap()
    else {
        panic!("expected insert");
    };
    assert_eq!(insert.returning, Some(vec!["id".to_string(), "name".to_string()]));

    let Statement::Insert(insert) =
        parse("INSERT INTO users (name) VALUES ($1) RETURNING *").unwrap()
    else {
        panic!("expected insert");
    };
    assert_eq!(insert.returning, Some(vec![]));
}

#[test]
fn test_insert_count_mismatch() {
    let err = parse("INSERT INTO users (a, b) VALUES ($1)").unwrap_err();
    assert!(err.to_string().contains("2 columns but 1 values"));
}

#[test]
fn test_insert_nested_expression_rejected() {
    let err = parse("INSERT INTO t (a, b) VALUES (coalesce($1, 0), $2)").unwrap_err();
    assert!(err.is_parse_error());
    assert!(err.to_string().contains("value list"));
}

#[test]
fn test_insert_missing_into() {
    let err = parse("INSERT users (a) VALUES (1)").unwrap_err();
    assert!(err.to_string().contains("INSERT INTO"));
}

#[test]
fn test_update() {
    let stmt = parse("UPDATE users SET name = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2").unwrap();
    let Statement::Update(update) = stmt else {
        panic!("expected update");
    };
    assert_eq!(update.collection, "users");
    assert_eq!(update.assignments.len(), 2);
    assert_eq!(update.assignments[0], ("name".to_string(), ValueSource::Param(1)));
    assert!(matches!(
        update.assignments[1].1,
        ValueSource::Literal(TypedValue::Timestamp(_))
    ));
    assert_eq!(
        update.predicates,
        vec![Predicate::compare("id", CompareOp::Eq, ValueSource::Param(2))]
    );
}

#[test]
fn test_update_expression_rejected() {
    let err = parse("UPDATE counters SET n = n + 1").unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_delete() {
    let Statement::Delete(delete) = parse("DELETE FROM sessions WHERE expires_at < $1").unwrap()
    else {
        panic!("expected delete");
    };
    assert_eq!(delete.collection, "sessions");
    assert_eq!(delete.predicates[0].op(), CompareOp::Lt);

    let Statement::Delete(delete) = parse("DELETE FROM sessions").unwrap() else {
        panic!("expected delete");
    };
    assert!(delete.predicates.is_empty());
}

#[test]
fn test_create_table() {
    let stmt = parse(
        "CREATE TABLE IF NOT EXISTS users (\n  id UUID PRIMARY KEY DEFAULT gen_random_uuid(),\n  name TEXT NOT NULL\n);",
    )
    .unwrap();
    assert_eq!(
        stmt,
        Statement::CreateTable(CreateTable {
            collection: "users".to_string(),
            if_not_exists: true
        })
    );
}

#[test]
fn test_create_table_missing_name() {
    let err = parse("CREATE TABLE (id TEXT)").unwrap_err();
    assert!(err.to_string().contains("collection name after TABLE"));
}

#[test]
fn test_create_index() {
    let stmt = parse("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)").unwrap();
    assert_eq!(
        stmt,
        Statement::CreateIndex(CreateIndex {
            index_name: "idx_users_email".to_string(),
            collection: "users".to_string(),
            fields: vec!["email".to_string()],
            unique: true,
            if_not_exists: true,
        })
    );
}

#[test]
fn test_create_index_composite_and_unnamed() {
    let Statement::CreateIndex(index) =
        parse("create index on matches using btree (user_id, created_at DESC)").unwrap()
    else {
        panic!("expected create index");
    };
    assert_eq!(index.index_name, "matches_user_id_created_at_idx");
    assert_eq!(index.fields, vec!["user_id".to_string(), "created_at".to_string()]);
    assert!(!index.unique);
}

#[test]
fn test_alter_table() {
    let stmt = parse("ALTER TABLE users ADD COLUMN IF NOT EXISTS bio TEXT").unwrap();
    assert_eq!(
        stmt,
        Statement::AlterTable(AlterTable {
            collection: "users".to_string()
        })
    );

    let err = parse("ALTER TABLE").unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_quoted_identifiers() {
    let Statement::Select(select) = parse(r#"SELECT "order", note FROM "user" WHERE "limit" = 1"#).unwrap()
    else {
        panic!("expected select");
    };
    assert_eq!(select.collection, "user");
    assert_eq!(select.projection[0], "order");
    assert_eq!(select.predicates[0].field(), "limit");
}

#[test]
fn test_select_aggregate_rejected() {
    let err = parse("SELECT COUNT(*) FROM users").unwrap_err();
    assert!(err.is_parse_error());
    assert!(err.to_string().contains("expected FROM"));

    let Statement::Select(select) = parse("SELECT count FROM stats").unwrap() else {
        panic!("expected select");
    };
    assert_eq!(select.projection, vec!["count".to_string()]);
}
