use crate::errors::CrudError;
use crate::query_builder::pagination::page_count;
use crate::query_builder::{
    parse_sort, to_snake_case, CrudOptions, Filter, PaginationRequest, PaginationResult, Projection,
    QueryFilter, Relation, SortField, SqlGenerator,
};
use crate::traits::{FindArgs, ModelSpec};
use crate::Row;
use serde_json::{json, Value};

fn users_spec() -> ModelSpec {
    ModelSpec {
        name: "User",
        table: "users",
        primary_key: "id",
        columns: &["id", "name", "email", "created_at", "updated_at", "deleted_at"],
        unique_columns: &["email"],
        soft_delete_column: "deleted_at",
        created_at_column: Some("created_at"),
        updated_at_column: Some("updated_at"),
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

// ========================================
// Sort parsing
// ========================================

#[test]
fn test_parse_sort_keeps_token_order() {
    let parsed = parse_sort("-createdAt,name", false).unwrap();
    assert_eq!(
        parsed,
        vec![SortField::desc("createdAt"), SortField::asc("name")]
    );
}

#[test]
fn test_parse_sort_converts_to_snake_case() {
    let parsed = parse_sort(" -createdAt , userName ,", true).unwrap();
    assert_eq!(
        parsed,
        vec![SortField::desc("created_at"), SortField::asc("user_name")]
    );
}

#[test]
fn test_parse_sort_blank_input_is_none() {
    assert_eq!(parse_sort("", true), None);
    assert_eq!(parse_sort("   ", true), None);
    assert_eq!(parse_sort(" , ,", false), None);
    assert_eq!(parse_sort("-", false), None);
}

#[test]
fn test_to_snake_case() {
    assert_eq!(to_snake_case("createdAt"), "created_at");
    assert_eq!(to_snake_case("already_snake"), "already_snake");
    assert_eq!(to_snake_case("CreatedAt"), "_created_at");
}

// ========================================
// Pagination
// ========================================

#[test]
fn test_pagination_defaults() {
    let request = PaginationRequest::default();
    assert_eq!(request.page(), 1);
    assert_eq!(request.page_size(), 10);
    assert_eq!(request.skip(), 0);

    let zeroes = PaginationRequest::new(0, 0);
    assert_eq!(zeroes.page(), 1);
    assert_eq!(zeroes.page_size(), 10);

    assert_eq!(PaginationRequest::new(3, 25).skip(), 50);
}

#[test]
fn test_pagination_request_lenient_deserialization() {
    let request: PaginationRequest =
        serde_json::from_value(json!({"page": "2", "pageSize": "abc", "sort": "-name"})).unwrap();
    assert_eq!(request.page(), 2);
    assert_eq!(request.page_size(), 10);
    assert_eq!(request.sort(), Some("-name"));

    let request: PaginationRequest =
        serde_json::from_value(json!({"page": -1, "pageSize": 5, "sort": ""})).unwrap();
    assert_eq!(request.page(), 1);
    assert_eq!(request.page_size(), 5);
    assert_eq!(request.sort(), None);

    let request: PaginationRequest = serde_json::from_value(json!({})).unwrap();
    assert_eq!(request, PaginationRequest::default());
}

#[test]
fn test_page_count() {
    assert_eq!(page_count(23, 10), 3);
    assert_eq!(page_count(20, 10), 2);
    assert_eq!(page_count(0, 10), 0);
    assert_eq!(page_count(1, 10), 1);
}

#[test]
fn test_pagination_result_serializes_camel_case() {
    let result: PaginationResult<Value> = PaginationResult::empty(1, 10);
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"rows": [], "total": 0, "pageCount": 0, "page": 1, "pageSize": 10})
    );
}

// ========================================
// Filters
// ========================================

#[test]
fn test_filter_from_flat_object() {
    let filter = Filter::from_value(&json!({"deleted_at": null})).unwrap();
    assert_eq!(filter.conditions(), &[QueryFilter::is_null("deleted_at")]);

    let filter = Filter::from_value(&json!({"name": "Ada"})).unwrap();
    assert_eq!(filter.conditions(), &[QueryFilter::eq("name", json!("Ada"))]);
}

#[test]
fn test_filter_from_operator_objects() {
    let filter = Filter::from_value(&json!({"age": {"gte": 18}})).unwrap();
    assert_eq!(filter.conditions(), &[QueryFilter::gte("age", json!(18))]);

    let filter =
        Filter::from_value(&json!({"name": {"contains": "50%", "mode": "insensitive"}})).unwrap();
    assert_eq!(filter.conditions(), &[QueryFilter::ilike("name", "%50\\%%")]);

    let filter = Filter::from_value(&json!({"id": {"in": [1, 2]}})).unwrap();
    assert_eq!(
        filter.conditions(),
        &[QueryFilter::in_values("id", vec![json!(1), json!(2)])]
    );

    let filter = Filter::from_value(&json!({"deleted_at": {"not": null}})).unwrap();
    assert_eq!(filter.conditions(), &[QueryFilter::is_not_null("deleted_at")]);
}

#[test]
fn test_filter_from_or_group() {
    let filter = Filter::from_value(&json!({"OR": [{"a": 1}, {"b": 2}]})).unwrap();
    assert_eq!(
        filter.conditions(),
        &[QueryFilter::or(vec![
            QueryFilter::and(vec![QueryFilter::eq("a", json!(1))]),
            QueryFilter::and(vec![QueryFilter::eq("b", json!(2))]),
        ])]
    );
}

#[test]
fn test_filter_rejects_malformed_input() {
    assert!(matches!(
        Filter::from_value(&json!({"age": {"between": [1, 2]}})),
        Err(CrudError::Validation { .. })
    ));
    assert!(Filter::from_value(&json!({"tags": ["a"]})).is_err());
    assert!(Filter::from_value(&json!([1, 2])).is_err());
    assert!(Filter::from_value(&json!({"OR": 3})).is_err());
    assert!(Filter::from_value(&Value::Null).unwrap().is_empty());
}

#[test]
fn test_scoped_filter_replaces_caller_soft_delete_condition() {
    let filter = Filter::new()
        .eq("deleted_at", "2024-01-01T00:00:00Z")
        .eq("name", "Ada");

    let scoped = filter.scoped("deleted_at", false);
    assert_eq!(
        scoped.conditions(),
        &[
            QueryFilter::eq("name", json!("Ada")),
            QueryFilter::is_null("deleted_at"),
        ]
    );

    assert_eq!(filter.scoped("deleted_at", true), filter);
}

// ========================================
// SQL generation
// ========================================

/// Placeholder typed as `column` of the users table
fn typed(n: usize, column: &str) -> String {
    format!(r#"(jsonb_populate_record(NULL::"users", ${})).{:?}"#, n, column)
}

#[test]
fn test_where_clause_numbers_parameters_in_order() {
    let filter = Filter::new()
        .eq("name", "a")
        .in_values("id", vec![json!(1), json!(2)])
        .is_null("deleted_at");

    let (sql, params) = SqlGenerator::build_where_clause("users", filter.conditions()).unwrap();
    assert_eq!(
        sql,
        format!(
            r#"WHERE "name" = {} AND "id" IN ({}, {}) AND "deleted_at" IS NULL"#,
            typed(1, "name"),
            typed(2, "id"),
            typed(3, "id")
        )
    );
    assert_eq!(
        params,
        vec![json!({"name": "a"}), json!({"id": 1}), json!({"id": 2})]
    );
}

#[test]
fn test_where_clause_types_values_by_column() {
    // A UUID-looking string stays a JSON string; the column decides its type
    let filter = Filter::new()
        .eq("email", "550e8400-e29b-41d4-a716-446655440000")
        .gte("created_at", "2024-01-01T00:00:00Z");

    let (sql, params) = SqlGenerator::build_where_clause("users", filter.conditions()).unwrap();
    assert_eq!(
        sql,
        format!(
            r#"WHERE "email" = {} AND "created_at" >= {}"#,
            typed(1, "email"),
            typed(2, "created_at")
        )
    );
    assert_eq!(
        params,
        vec![
            json!({"email": "550e8400-e29b-41d4-a716-446655440000"}),
            json!({"created_at": "2024-01-01T00:00:00Z"}),
        ]
    );
}

#[test]
fn test_like_patterns_bind_as_text() {
    let filter = Filter::new().like("name", "A%").and(QueryFilter::ilike("email", "%@EXAMPLE.COM"));

    let (sql, params) = SqlGenerator::build_where_clause("users", filter.conditions()).unwrap();
    assert_eq!(sql, r#"WHERE "name"::text LIKE $1 AND "email"::text ILIKE $2"#);
    assert_eq!(params, vec![json!("A%"), json!("%@EXAMPLE.COM")]);
}

#[test]
fn test_where_clause_empty_lists_and_groups() {
    let filter = Filter::new()
        .in_values("id", vec![])
        .not_in_values("id", vec![])
        .and(QueryFilter::or(vec![]));

    let (sql, params) = SqlGenerator::build_where_clause("users", filter.conditions()).unwrap();
    assert_eq!(sql, "WHERE 1=0 AND 1=1 AND FALSE");
    assert!(params.is_empty());
}

#[test]
fn test_where_clause_rejects_injected_names() {
    let filter = Filter::new().eq("name\" = '' OR 1=1 --", "x");
    assert!(matches!(
        SqlGenerator::build_where_clause("users", filter.conditions()),
        Err(CrudError::InvalidIdentifier(_))
    ));
    assert!(SqlGenerator::build_where_clause("users; DROP TABLE users", &[]).is_err());
}

#[test]
fn test_select_statement() {
    let args = FindArgs::new(Filter::new().eq("status", "active"))
        .order_by(vec![SortField::desc("created_at")])
        .take(10)
        .skip(20);

    let statement = SqlGenerator::select(&users_spec(), &args).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            r#"SELECT to_jsonb(t.*) AS record FROM "users" t WHERE "status" = {} ORDER BY t."created_at" DESC LIMIT 10 OFFSET 20"#,
            typed(1, "status")
        )
    );
    assert_eq!(statement.params, vec![json!({"status": "active"})]);
}

#[test]
fn test_limit_clause_is_clamped_to_bigint() {
    assert_eq!(
        SqlGenerator::build_limit_clause(Some(u64::MAX), Some(u64::MAX)),
        format!("LIMIT {} OFFSET {}", i64::MAX, i64::MAX)
    );
    assert_eq!(SqlGenerator::build_limit_clause(Some(5), None), "LIMIT 5");

    let request = PaginationRequest::new(u64::MAX, u64::MAX);
    assert_eq!(request.page_size(), i64::MAX as u64);
    assert_eq!(request.skip(), i64::MAX as u64);
}

#[test]
fn test_count_statement() {
    let statement = SqlGenerator::count(&users_spec(), &[QueryFilter::is_null("deleted_at")]).unwrap();
    assert_eq!(
        statement.sql,
        r#"SELECT COUNT(*) AS total FROM "users" t WHERE "deleted_at" IS NULL"#
    );
}

#[test]
fn test_projection_with_select_and_include() {
    let projection = CrudOptions::new()
        .select(&["id", "name"])
        .include(Relation::has_many("posts", "posts", "author_id"))
        .projection();

    let sql = SqlGenerator::build_projection(&projection, "t").unwrap();
    assert_eq!(
        sql,
        "jsonb_build_object('id', t.\"id\", 'name', t.\"name\") || \
         jsonb_build_object('posts', (SELECT COALESCE(jsonb_agg(to_jsonb(r.*)), '[]'::jsonb) \
         FROM \"posts\" r WHERE r.\"author_id\" = t.\"id\"))"
    );

    let belongs = Projection {
        select: None,
        include: vec![Relation::belongs_to("author", "users", "author_id")],
    };
    let sql = SqlGenerator::build_projection(&belongs, "t").unwrap();
    assert!(sql.ends_with(
        "jsonb_build_object('author', (SELECT to_jsonb(r.*) FROM \"users\" r WHERE r.\"id\" = t.\"author_id\" LIMIT 1))"
    ));
}

#[test]
fn test_insert_statement() {
    let data = row(json!({"email": "ada@example.com", "name": "Ada", "deleted_at": null}));
    let statement = SqlGenerator::insert(&users_spec(), &data, &Projection::default()).unwrap();

    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (n, column) in data.keys().enumerate() {
        columns.push(format!("{:?}", column));
        values.push(typed(n + 1, column));
    }
    assert_eq!(
        statement.sql,
        format!(
            r#"WITH t AS (INSERT INTO "users" ({}) VALUES ({}) RETURNING *) SELECT to_jsonb(t.*) AS record FROM t"#,
            columns.join(", "),
            values.join(", ")
        )
    );
    assert!(statement.params.contains(&json!({"deleted_at": null})));
    assert!(statement.params.contains(&json!({"email": "ada@example.com"})));

    let empty = SqlGenerator::insert(&users_spec(), &Row::new(), &Projection::default()).unwrap();
    assert!(empty.sql.contains(r#"INSERT INTO "users" DEFAULT VALUES RETURNING *"#));
}

#[test]
fn test_insert_many_uses_default_for_missing_keys() {
    let rows = vec![
        row(json!({"email": "a@example.com"})),
        row(json!({"name": "B"})),
    ];
    let statement = SqlGenerator::insert_many(&users_spec(), &rows, true).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            r#"INSERT INTO "users" ("email", "name") VALUES ({}, DEFAULT), (DEFAULT, {}) ON CONFLICT DO NOTHING"#,
            typed(1, "email"),
            typed(2, "name")
        )
    );
    assert_eq!(
        statement.params,
        vec![json!({"email": "a@example.com"}), json!({"name": "B"})]
    );

    let rows = vec![Row::new()];
    assert!(SqlGenerator::insert_many(&users_spec(), &rows, false).is_err());
}

#[test]
fn test_update_targets_first_match_and_touches_updated_at() {
    let filter = Filter::new().eq("email", "ada@example.com");
    let data = row(json!({"name": "Ada L."}));
    let statement =
        SqlGenerator::update(&users_spec(), filter.conditions(), &data, &Projection::default()).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            r#"WITH t AS (UPDATE "users" SET "name" = {}, "updated_at" = NOW() WHERE "id" = (SELECT "id" FROM "users" WHERE "email" = {} LIMIT 1) RETURNING *) SELECT to_jsonb(t.*) AS record FROM t"#,
            typed(2, "name"),
            typed(1, "email")
        )
    );
    assert_eq!(
        statement.params,
        vec![json!({"email": "ada@example.com"}), json!({"name": "Ada L."})]
    );
}

#[test]
fn test_update_restoring_null_is_typed_by_column() {
    let filter = Filter::new().eq("id", 7);
    let data = row(json!({"deleted_at": null}));
    let statement =
        SqlGenerator::update(&users_spec(), filter.conditions(), &data, &Projection::default()).unwrap();
    assert!(statement
        .sql
        .contains(&format!(r#"SET "deleted_at" = {}, "updated_at" = NOW()"#, typed(2, "deleted_at"))));
    assert_eq!(statement.params[1], json!({"deleted_at": null}));
}

#[test]
fn test_update_many_numbers_where_after_set() {
    let filter = Filter::new().in_values("id", vec![json!(1), json!(2)]).is_null("deleted_at");
    let data = row(json!({"name": "x"}));
    let statement = SqlGenerator::update_many(&users_spec(), filter.conditions(), &data).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            r#"UPDATE "users" SET "name" = {}, "updated_at" = NOW() WHERE "id" IN ({}, {}) AND "deleted_at" IS NULL"#,
            typed(1, "name"),
            typed(2, "id"),
            typed(3, "id")
        )
    );
    assert_eq!(
        statement.params,
        vec![json!({"name": "x"}), json!({"id": 1}), json!({"id": 2})]
    );
}

#[test]
fn test_update_without_updated_at_column_needs_data() {
    let mut spec = users_spec();
    spec.columns = &["id", "name"];
    assert!(matches!(
        SqlGenerator::update_many(&spec, &[], &Row::new()),
        Err(CrudError::Validation { .. })
    ));
}

#[test]
fn test_delete_statements() {
    let filter = Filter::new().eq("id", 5);
    let statement =
        SqlGenerator::delete(&users_spec(), filter.conditions(), &Projection::default()).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            r#"WITH t AS (DELETE FROM "users" WHERE "id" = (SELECT "id" FROM "users" WHERE "id" = {} LIMIT 1) RETURNING *) SELECT to_jsonb(t.*) AS record FROM t"#,
            typed(1, "id")
        )
    );

    let statement = SqlGenerator::delete_many(&users_spec(), &[]).unwrap();
    assert_eq!(statement.sql, r#"DELETE FROM "users""#);
}

#[test]
fn test_upsert_statement() {
    let filter = Filter::new().eq("email", "ada@example.com");
    let create = row(json!({"email": "ada@example.com"}));
    let update = row(json!({"name": "Ada"}));
    let statement = SqlGenerator::upsert(
        &users_spec(),
        filter.conditions(),
        &create,
        &update,
        &Projection::default(),
    )
    .unwrap();

    assert!(statement.sql.starts_with(&format!(
        r#"WITH existing AS (SELECT "id" FROM "users" WHERE "email" = {} LIMIT 1 FOR UPDATE)"#,
        typed(1, "email")
    )));
    assert!(statement.sql.contains(&format!(
        r#"UPDATE "users" SET "name" = {}, "updated_at" = NOW() WHERE "id" IN (SELECT "id" FROM existing)"#,
        typed(2, "name")
    )));
    assert!(statement.sql.contains(&format!(
        r#"INSERT INTO "users" ("email") SELECT {} WHERE NOT EXISTS (SELECT 1 FROM existing)"#,
        typed(3, "email")
    )));
    assert_eq!(statement.params.len(), 3);

    assert!(SqlGenerator::upsert(&users_spec(), &[], &Row::new(), &update, &Projection::default()).is_err());
}
