use super::*;
use crate::{
    config::Backend,
    db::migrate::MigrationPlan,
    error::ErrorClass,
    obs::StatementMetrics,
    test_support::{Note, RecordingExecutor, User, session, user_row},
};

const USER_COLUMNS: &str = "(`$PrimaryKey`,`$Key`,`$Parent`,`Name`,`Age`,`Score`,`Tags`,\
                            `Address.Line`,`Address.City`,`Location`,`DeletedAt`)";

fn ann() -> User {
    User {
        name: "Ann".into(),
        age: 30,
        score: 1.5,
        tags: vec!["a".into()],
        ..User::default()
    }
}

// ---- inserts -----------------------------------------------------------

#[test]
fn create_writes_one_row_and_assigns_the_key() {
    let session = session();
    let mut user = ann();

    session
        .create(&mut user, Some(&Key::name_key("User", "ann", None)))
        .expect("create");

    let call = session.executor().last();
    assert_eq!(
        call.sql,
        format!("INSERT INTO `app`.`User` {USER_COLUMNS} VALUES (?,?,?,?,?,?,?,?,?,?,?);")
    );
    assert_eq!(
        call.args,
        vec![
            Some("/ann".to_string()),
            Some("ann".to_string()),
            Some(String::new()),
            Some("Ann".to_string()),
            Some("30".to_string()),
            Some("1.500000".to_string()),
            Some(r#"["a"]"#.to_string()),
            Some(String::new()),
            Some(String::new()),
            None,
            None,
        ]
    );
    assert_eq!(user.key, Key::name_key("User", "ann", None));
}

#[test]
fn create_under_foreign_parent_generates_a_child_key() {
    let session = session();
    let org = Key::name_key("Org", "acme", None);
    let mut user = ann();

    session.create(&mut user, Some(&org)).expect("create");

    assert_eq!(user.key.kind(), "User");
    assert_eq!(user.key.parent(), Some(&org));
    assert!(user.key.id() >= crate::key::MIN_GENERATED_ID);

    let args = session.executor().last().args;
    assert_eq!(args[2].as_deref(), Some("Org,acme"));
}

#[test]
fn create_many_is_a_single_statement() {
    let session = session();
    let mut users = vec![ann(), ann(), ann()];

    session.create_many(&mut users, None).expect("create many");

    let calls = session.executor().calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].sql.ends_with(
        "VALUES (?,?,?,?,?,?,?,?,?,?,?),(?,?,?,?,?,?,?,?,?,?,?),(?,?,?,?,?,?,?,?,?,?,?);"
    ));
    assert_eq!(calls[0].args.len(), 33);
}

#[test]
fn empty_batch_runs_nothing() {
    let session = session();

    session.create_many::<User>(&mut [], None).expect("empty");

    assert!(session.executor().calls().is_empty());
}

#[test]
fn oversized_batch_is_rejected() {
    let mut config = Config::new("app");
    config.max_batch_size = 2;
    let session = Session::new(RecordingExecutor::default(), config);
    let mut users = vec![ann(), ann(), ann()];

    let err = session.create_many(&mut users, None).unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidInput);
    assert!(session.executor().calls().is_empty());
}

#[test]
fn parents_must_pair_with_records() {
    let session = session();
    let mut users = vec![ann(), ann()];

    let err = session
        .create_many_with_parents(&mut users, &[Key::name_key("Org", "a", None)])
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidInput);
}

#[test]
fn each_record_gets_its_own_parent() {
    let session = session();
    let mut users = vec![ann(), ann()];
    let parents = [Key::name_key("Org", "a", None), Key::name_key("Org", "b", None)];

    session
        .create_many_with_parents(&mut users, &parents)
        .expect("create");

    assert_eq!(users[0].key.parent(), Some(&parents[0]));
    assert_eq!(users[1].key.parent(), Some(&parents[1]));
}

#[test]
fn save_hook_runs_before_encoding() {
    let session = session();
    let mut note = Note {
        body: "  hello  ".into(),
        ..Note::default()
    };

    session.create(&mut note, None).expect("create");

    assert_eq!(note.body, "hello");
    assert_eq!(
        session.executor().last().args.last(),
        Some(&Some("hello".to_string()))
    );
}

// ---- upserts -----------------------------------------------------------

#[test]
fn upsert_updates_all_but_excluded_columns() {
    let session = session();
    let mut user = ann();

    session
        .upsert(&mut user, None, &["Name", "$Key", "Tags"])
        .expect("upsert");

    let sql = session.executor().last().sql;
    assert!(sql.ends_with(
        " ON DUPLICATE KEY UPDATE `Age`=VALUES(`Age`),`Score`=VALUES(`Score`),\
         `Address.Line`=VALUES(`Address.Line`),`Address.City`=VALUES(`Address.City`),\
         `Location`=VALUES(`Location`),`DeletedAt`=VALUES(`DeletedAt`);"
    ));
}

#[test]
fn upsert_with_everything_excluded_still_compiles() {
    let session = session();
    let mut note = Note::default();

    session.upsert(&mut note, None, &["Body"]).expect("upsert");

    assert!(session
        .executor()
        .last()
        .sql
        .ends_with(" ON DUPLICATE KEY UPDATE `$PrimaryKey`=VALUES(`$PrimaryKey`);"));
}

#[test]
fn upsert_reuses_the_records_own_key() {
    let session = session();
    let mut user = User {
        key: Key::id_key("User", 5, None),
        ..ann()
    };

    session.upsert(&mut user, None, &[]).expect("upsert");

    let args = session.executor().last().args;
    assert_eq!(args[0].as_deref(), Some("/5"));
    assert_eq!(user.key, Key::id_key("User", 5, None));
}

// ---- keyed mutations ---------------------------------------------------

#[test]
fn update_sets_every_column_by_primary_key() {
    let session = session();
    let parent = Key::name_key("Org", "acme", None);
    let mut user = User {
        key: Key::name_key("User", "ann", Some(parent)),
        ..ann()
    };

    session.update(&mut user).expect("update");

    let call = session.executor().last();
    assert_eq!(
        call.sql,
        "UPDATE `app`.`User` SET `Name` = ?,`Age` = ?,`Score` = ?,`Tags` = ?,\
         `Address.Line` = ?,`Address.City` = ?,`Location` = ?,`DeletedAt` = ? \
         WHERE `$PrimaryKey` = ?;"
    );
    assert_eq!(call.args.last(), Some(&Some("Org,acme/ann".to_string())));
}

#[test]
fn update_without_key_is_rejected() {
    let session = session();

    let err = session.update(&mut ann()).unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidInput);
    assert!(session.executor().calls().is_empty());
}

#[test]
fn delete_targets_the_primary_key() {
    let session = session();

    session
        .delete::<User>(&Key::id_key("User", 7, None))
        .expect("delete");

    let call = session.executor().last();
    assert_eq!(call.sql, "DELETE FROM `app`.`User` WHERE `$PrimaryKey` = ?;");
    assert_eq!(call.args, vec![Some("/7".to_string())]);
}

#[test]
fn delete_many_uses_a_membership_test() {
    let session = session();
    let keys = [Key::id_key("User", 1, None), Key::id_key("User", 2, None)];

    session.delete_many::<User>(&keys).expect("delete");
    assert_eq!(
        session.executor().last().sql,
        "DELETE FROM `app`.`User` WHERE `$PrimaryKey` IN (?,?);"
    );

    assert_eq!(session.delete_many::<User>(&[]).expect("no keys"), 0);
    assert_eq!(session.executor().calls().len(), 1);
}

#[test]
fn soft_delete_stamps_the_marker() {
    let session = session();
    let key = Key::name_key("User", "ann", Some(Key::name_key("Org", "acme", None)));

    session.soft_delete::<User>(&key).expect("soft delete");

    let call = session.executor().last();
    assert_eq!(
        call.sql,
        "UPDATE `app`.`User` SET `DeletedAt` = ? WHERE `$Key` = ? AND `$Parent` = ?;"
    );
    assert!(call.args[0].is_some());
    assert_eq!(&call.args[1..], &[Some("ann".to_string()), Some("Org,acme".to_string())]);
}

#[test]
fn soft_delete_needs_a_marker() {
    let session = session();

    let err = session
        .soft_delete::<Note>(&Key::id_key("Note", 1, None))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Unsupported);
}

// ---- schema ------------------------------------------------------------

#[test]
fn migrate_runs_the_planned_statement() {
    let session = session();

    let plan = session.migrate::<Note>().expect("migrate");

    assert!(matches!(plan, MigrationPlan::Create(_)));
    assert_eq!(session.executor().sqls(), vec![plan.statement().unwrap_or_default().to_string()]);
}

#[test]
fn migrate_against_a_matching_table_runs_nothing() {
    let session = session();
    let key_column = |name: &str, length: u32, position: &str| {
        Row::new()
            .with("COLUMN_NAME", Some(name))
            .with("COLUMN_TYPE", Some(format!("varchar({length})").as_str()))
            .with("IS_NULLABLE", Some("NO"))
            .with("CHARACTER_SET_NAME", Some("latin2"))
            .with("COLLATION_NAME", Some("latin2_general_ci"))
            .with("ORDINAL_POSITION", Some(position))
    };
    session.executor().set_catalog(vec![
        key_column("$PrimaryKey", 512, "1"),
        key_column("$Key", 50, "2"),
        key_column("$Parent", 512, "3"),
        Row::new()
            .with("COLUMN_NAME", Some("Body"))
            .with("COLUMN_TYPE", Some("varchar(255)"))
            .with("IS_NULLABLE", Some("NO"))
            .with("COLUMN_DEFAULT", Some(""))
            .with("CHARACTER_SET_NAME", Some("utf8mb3"))
            .with("COLLATION_NAME", Some("utf8mb3_unicode_ci"))
            .with("ORDINAL_POSITION", Some("4")),
    ]);

    let plan = session.migrate::<Note>().expect("migrate");

    assert!(plan.is_noop());
    assert!(session.executor().calls().is_empty());
}

#[test]
fn unique_index_replaces_an_existing_one() {
    let session = session();
    session
        .executor()
        .push_rows(vec![Row::new().with("INDEX_NAME", Some("Name_Age"))]);

    session
        .unique_index::<User>(&["Name", "Age"])
        .expect("unique index");

    let calls = session.executor().calls();
    assert_eq!(
        calls[0].args,
        vec![
            Some("app".to_string()),
            Some("User".to_string()),
            Some("Name_Age".to_string())
        ]
    );
    assert_eq!(calls[1].sql, "ALTER TABLE `app`.`User` DROP INDEX `Name_Age`;");
    assert_eq!(
        calls[2].sql,
        "CREATE UNIQUE INDEX `Name_Age` ON `app`.`User` (`Name`,`Age`);"
    );
}

#[test]
fn unique_index_rejects_unknown_columns() {
    let session = session();

    let err = session.unique_index::<User>(&["Nope"]).unwrap_err();

    assert_eq!(err.class, ErrorClass::InvalidInput);
    assert!(session.executor().calls().is_empty());
}

#[test]
fn drop_unique_index_skips_missing_index() {
    let session = session();

    session
        .drop_unique_index::<User>(&["Name"])
        .expect("drop index");

    assert_eq!(session.executor().calls().len(), 1);
}

#[test]
fn drop_table_variants() {
    let session = session();

    session.drop_table::<Note>().expect("drop");
    session.drop_table_if_exists::<Note>().expect("drop if exists");

    assert_eq!(
        session.executor().sqls(),
        vec![
            "DROP TABLE `app`.`Note`;".to_string(),
            "DROP TABLE IF EXISTS `app`.`Note`;".to_string()
        ]
    );
}

// ---- transactions ------------------------------------------------------

#[test]
fn transaction_commits_on_success() {
    let session = session();

    let seen = session
        .run_in_transaction(|tx| {
            assert!(tx.in_transaction());
            tx.delete::<User>(&Key::id_key("User", 1, None))
        })
        .expect("transaction");

    assert_eq!(seen, 1);
    assert!(!session.in_transaction());
    assert_eq!(session.executor().transactions(), vec!["begin", "commit"]);
}

#[test]
fn transaction_rolls_back_on_error() {
    let session = Session::new(RecordingExecutor::failing_on("DELETE"), Config::new("app"));

    let err = session
        .run_in_transaction(|tx| tx.delete::<User>(&Key::id_key("User", 1, None)))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Execution);
    assert!(err.source.is_some());
    assert_eq!(session.executor().transactions(), vec!["begin", "rollback"]);
}

#[test]
fn nested_transaction_joins_the_outer_one() {
    let session = session();

    session
        .run_in_transaction(|tx| tx.run_in_transaction(|inner| inner.execute("SELECT 1", &[])))
        .expect("nested");

    assert_eq!(session.executor().transactions(), vec!["begin", "commit"]);
}

// ---- plumbing ----------------------------------------------------------

#[test]
fn find_decodes_the_row_and_runs_the_load_hook() {
    let session = session();
    session
        .executor()
        .push_rows(vec![user_row("ann", "Org,acme", "Ann")]);

    let user: User = session
        .find(&Key::name_key("User", "ann", Some(Key::name_key("Org", "acme", None))))
        .expect("find");

    assert_eq!(user.name, "Ann");
    assert_eq!(user.address.city, "Ipoh");
    assert_eq!(user.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(user.key.parent().map(Key::kind), Some("Org"));

    session
        .executor()
        .push_rows(vec![Row::new().with("$Key", Some("1")).with("Body", Some("x"))]);
    let note: Note = session.find(&Key::id_key("Note", 1, None)).expect("note");
    assert!(note.loaded);
}

#[test]
fn find_without_row_is_not_found() {
    let session = session();

    let err = session
        .find::<User>(&Key::id_key("User", 1, None))
        .unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn hierarchical_backend_refuses_relational_actions() {
    let config = Config::new("app").with_backend(Backend::Hierarchical);
    let session = Session::new(RecordingExecutor::default(), config);

    for err in [
        session.migrate::<User>().unwrap_err(),
        session.statement("SELECT 1", &[]).unwrap_err(),
        session.query::<User>().count().unwrap_err(),
        session.delete::<User>(&Key::id_key("User", 1, None)).unwrap_err(),
    ] {
        assert_eq!(err.class, ErrorClass::Unsupported);
    }
    assert!(session.executor().calls().is_empty());
}

#[test]
fn statements_are_reported_to_the_metrics_sink() {
    let metrics = Arc::new(StatementMetrics::new());
    let session = session().with_metrics(metrics.clone());

    session.delete::<User>(&Key::id_key("User", 1, None)).expect("delete");
    session.statement("SELECT 1", &[]).expect("raw");

    let report = metrics.report();
    assert_eq!(report.models_derived, 1);
    assert_eq!(report.delete_calls, 1);
    assert_eq!(report.raw_calls, 1);
    assert_eq!(report.rows_affected, 1);
}

#[test]
fn models_are_derived_once_per_cache() {
    let session = session();

    session.model::<User>().expect("user");
    session.model::<User>().expect("user again");
    session.model::<Note>().expect("note");

    assert_eq!(session.models().len(), 2);
}

#[test]
fn filter_documents_are_parsed_against_the_model() {
    let session = session();

    let filters = session
        .parse_filters::<User>(r#"{"Age": {"$gte": 18}, "Name": "Ann"}"#)
        .expect("filters");

    assert_eq!(filters.len(), 2);
    assert!(session.parse_filters::<User>(r#"{"Nope": 1}"#).is_err());
}
