mod common;

use common::{Product, product_row, session};
use loquat::{error::ErrorClass, prelude::*, value::quote};
use proptest::prelude::*;

#[test]
fn builder_compiles_filters_in_order() {
    let session = session();

    let stmt = session
        .query::<Product>()
        .filter("Price", ">=", 10)
        .filter("Title", "=", "it's")
        .order("-Price")
        .limit(5)
        .compile()
        .expect("compile");

    assert_eq!(
        stmt.select_sql(),
        "SELECT * FROM `shop`.`Product` WHERE `Price` >= 10 AND `Title` = 'it''s' \
         AND `DeletedAt` IS NULL ORDER BY `Price` DESC LIMIT 5;"
    );
}

#[test]
fn json_filter_document_drives_the_query() {
    let session = session();
    let document = serde_json::json!({
        "Stock": { "$gt": 0 },
        "Supplier": { "$ne": null },
        "Labels": ["new", "sale"],
    })
    .to_string();

    let filters = session
        .parse_filters::<Product>(&document)
        .expect("parsed");

    let stmt = session
        .query::<Product>()
        .filters(filters)
        .compile()
        .expect("compile");
    assert_eq!(
        stmt.filters,
        [
            "`Labels` = 'new'",
            "`Labels` = 'sale'",
            "`Stock` > 0",
            "`Supplier` IS NOT NULL",
            "`DeletedAt` IS NULL",
        ]
    );
}

#[test]
fn unknown_field_is_reported_by_the_terminal() {
    let session = session();

    let err = session
        .query::<Product>()
        .filter("Colour", "=", "red")
        .get()
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidInput);
    assert!(err.message.contains("Colour"));
    assert!(session.executor().statements().is_empty());
}

#[test]
fn ancestor_restricts_to_descendants() {
    let session = session();
    let store = Key::name_key("Store", "kl_1", None);

    let stmt = session
        .query::<Product>()
        .ancestor(store)
        .with_trashed()
        .compile()
        .expect("compile");

    assert_eq!(
        stmt.filters,
        [r"(`$Parent` LIKE 'Store,kl\\_1' OR `$Parent` LIKE 'Store,kl\\_1/%')"]
    );
}

#[test]
fn pages_resume_from_the_returned_token() {
    let session = session();
    session.executor().queue(vec![
        product_row("1", "", "A", "1"),
        product_row("2", "", "B", "2"),
        product_row("3", "", "C", "3"),
    ]);

    let first = session
        .query::<Product>()
        .paginate(&PageRequest::default())
        .expect("first page");

    assert_eq!(first.records.len(), 2);
    assert!(first.has_more());
    assert!(session.executor().last().sql.ends_with("LIMIT 3;"));

    session
        .executor()
        .queue(vec![product_row("3", "", "C", "3")]);
    let request = PageRequest::resume(0, &first.next_token()).expect("token");
    let second = session
        .query::<Product>()
        .paginate(&request)
        .expect("second page");

    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].sku, "C");
    assert!(second.next_token().is_empty());
    assert!(session.executor().last().sql.ends_with("LIMIT 3 OFFSET 2;"));
}

#[test]
fn single_row_pages_walk_to_an_empty_token() {
    let session = session();
    let rows = [
        product_row("1", "", "A", "1"),
        product_row("2", "", "B", "2"),
        product_row("3", "", "C", "3"),
    ];

    let mut token = String::new();
    let mut skus = Vec::new();
    for (call, expected_tail) in ["LIMIT 2;", "LIMIT 2 OFFSET 1;", "LIMIT 2 OFFSET 2;"]
        .into_iter()
        .enumerate()
    {
        session
            .executor()
            .queue(rows.iter().skip(call).take(2).cloned().collect());
        let request = PageRequest::resume(1, &token).expect("token");
        let page = session
            .query::<Product>()
            .paginate(&request)
            .expect("page");

        assert_eq!(page.records.len(), 1);
        assert!(session.executor().last().sql.ends_with(expected_tail));
        skus.push(page.records[0].sku.clone());
        token = page.next_token();
    }

    assert_eq!(skus, ["A", "B", "C"]);
    assert!(token.is_empty());
}

#[test]
fn unscoped_bulk_delete_is_refused() {
    let session = session();

    let err = session.query::<Product>().delete().unwrap_err();

    assert_eq!(err.class, ErrorClass::ScopeGuard);
    assert!(session.executor().statements().is_empty());
}

#[test]
fn scoped_bulk_update_binds_new_values() {
    let session = session();

    session
        .query::<Product>()
        .filter("Stock", "=", 0)
        .update(&[("Title", Value::from("sold out"))])
        .expect("update");

    let stmt = session.executor().last();
    assert_eq!(
        stmt.sql,
        "UPDATE `shop`.`Product` SET `Title` = ? WHERE `Stock` = 0;"
    );
    assert_eq!(stmt.args, vec![Some("sold out".to_string())]);
}

#[test]
fn transaction_commits_and_keeps_the_lock() {
    let session = session();

    session
        .run_in_transaction(|tx| {
            tx.query::<Product>()
                .filter("Sku", "=", "A")
                .lock_for_update()
                .get()
        })
        .expect("transaction");

    assert_eq!(session.executor().log(), vec!["BEGIN", "COMMIT"]);
    assert!(session.executor().last().sql.ends_with(" FOR UPDATE;"));
}

#[test]
fn failing_transaction_rolls_back() {
    let session = session();
    session.executor().reject("DELETE");

    let err = session
        .run_in_transaction(|tx| {
            tx.delete::<Product>(&Key::id_key("Product", 1, None))?;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Execution);
    assert_eq!(session.executor().log(), vec!["BEGIN", "ROLLBACK"]);
}

proptest! {
    #[test]
    fn key_filters_match_the_stored_columns(name in "[a-z][a-z0-9_%']{0,11}", id in 1_i64..i64::MAX) {
        let session = session();
        let key = Key::id_key("Product", id, Some(Key::name_key("Store", name.clone(), None)));

        let stmt = session
            .query::<Product>()
            .filter("__key__", "=", key)
            .compile()
            .expect("compile");

        let expected = format!(
            "(`$Key` = '{id}' AND `$Parent` = {})",
            quote(&format!("Store,{name}"))
        );
        prop_assert_eq!(&stmt.filters[0], &expected);
    }
}
