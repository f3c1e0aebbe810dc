use campus_api::filter::{ListQuery, ListSelect, OrderBy, Page, Param, Predicate};

// The query builder is the single path every list read takes; these tests
// pin the exact SQL it emits.

#[test]
fn list_select_combines_scope_filter_search_and_page() {
    let scope = Predicate::eq("parent_id", Param::Uuid(uuid::Uuid::nil()));
    let predicate = Predicate::and(vec![
        scope,
        Predicate::eq("class_id", 3),
        Predicate::Search(vec!["name", "surname"], "ann".to_string()),
    ]);

    let select = ListSelect::new("student_directory")
        .unwrap()
        .predicate(predicate)
        .order(OrderBy::resolve(&["surname"], Some("surname"), Some("desc")))
        .page(Page::new(2, 10));

    let sql = select.to_sql();
    assert_eq!(
        sql.query,
        "SELECT * FROM \"student_directory\" WHERE (\"parent_id\" = $1 AND \"class_id\" = $2 \
         AND (\"name\" ILIKE $3 OR \"surname\" ILIKE $4)) ORDER BY \"surname\" DESC \
         LIMIT 10 OFFSET 10"
    );
    assert_eq!(sql.params.len(), 4);
}

#[test]
fn count_query_matches_row_query_predicate() {
    let select = ListSelect::new("payments")
        .unwrap()
        .predicate(Predicate::and(vec![
            Predicate::eq("student_id", Param::Uuid(uuid::Uuid::nil())),
            Predicate::eq_text("status", "PENDING"),
        ]))
        .page(Page::new(3, 10));

    let rows = select.to_sql();
    let count = select.to_count_sql();

    assert!(rows.query.contains("\"status\"::text = $2"));
    assert!(count.query.contains("\"status\"::text = $2"));
    assert!(!count.query.contains("LIMIT"));
    assert_eq!(rows.params, count.params);
}

#[test]
fn page_parameter_is_forgiving() {
    for raw in [None, Some("0"), Some("-1"), Some("abc"), Some("")] {
        let query = ListQuery {
            page: raw.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(query.page_number(), 1, "page={:?}", raw);
    }

    let query = ListQuery {
        page: Some("5".to_string()),
        ..Default::default()
    };
    assert_eq!(query.page(10).offset(), 40);
}

#[test]
fn unknown_sort_keys_fall_back_to_stable_order() {
    let order = OrderBy::resolve(
        &["name", "surname"],
        Some("password_hash; DROP TABLE users"),
        Some("desc"),
    );
    assert_eq!(order.to_sql(), "ORDER BY \"id\" ASC");
}

#[test]
fn search_terms_match_literally() {
    let mut params = vec![];
    Predicate::Search(vec!["title"], "100%_done".to_string()).to_sql(&mut params);
    assert_eq!(params, vec![Param::Text("%100\\%\\_done%".to_string())]);
}

#[test]
fn capacity_range_bucket_parses() {
    assert_eq!(ListQuery::range("20-30").unwrap(), (20, 30));
    assert!(ListQuery::range("30-20").is_err());
    assert!(ListQuery::range("wide").is_err());
}
