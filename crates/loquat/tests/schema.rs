mod common;

use common::{MockExecutor, Product, Store, session};
use loquat::{
    Config, Entity, Record, Session,
    config::Backend,
    db::{MigrationPlan, Row},
    error::ErrorClass,
};

fn catalog_row(name: &str, column_type: &str, position: u32) -> Row {
    Row::new()
        .with("COLUMN_NAME", Some(name))
        .with("COLUMN_TYPE", Some(column_type))
        .with("IS_NULLABLE", Some("NO"))
        .with("COLUMN_DEFAULT", None)
        .with("CHARACTER_SET_NAME", None)
        .with("COLLATION_NAME", None)
        .with("COLUMN_KEY", Some(""))
        .with("ORDINAL_POSITION", Some(position.to_string().as_str()))
}

#[test]
fn first_migration_creates_the_table() {
    let session = session();

    let plan = session.migrate::<Product>().expect("migrate");

    let MigrationPlan::Create(sql) = plan else {
        panic!("expected a create plan, got {plan:?}");
    };
    assert!(sql.starts_with("CREATE TABLE `shop`.`Product` (`$PrimaryKey` varchar(512)"));
    for column in ["`Size.Width`", "`Size.Height`", "`Labels`", "`UpdatedAt`", "`DeletedAt`"] {
        assert!(sql.contains(column), "{column} missing from {sql}");
    }
    assert!(sql.contains("CONSTRAINT `$PrimaryKey` UNIQUE (`$Parent`, `$Key`)"));
    assert_eq!(session.executor().last().sql, sql);
}

#[test]
fn drifted_table_is_altered() {
    let session = session();
    session.executor().set_catalog(vec![
        catalog_row("$PrimaryKey", "varchar(512)", 1),
        catalog_row("$Key", "varchar(50)", 2),
        catalog_row("$Parent", "varchar(512)", 3),
        catalog_row("Retired", "int(11)", 4),
    ]);

    let plan = session.migrate::<Store>().expect("migrate");

    let sql = plan.statement().expect("alter statement");
    assert!(sql.starts_with("ALTER TABLE `shop`.`Store` "));
    assert!(sql.contains("ADD `Name`"));
    assert!(sql.contains("DROP `Retired`"));
}

#[test]
fn unique_index_is_named_after_its_columns() {
    let session = session();

    session
        .unique_index::<Product>(&["Sku", "Title"])
        .expect("index");

    assert_eq!(
        session.executor().last().sql,
        "CREATE UNIQUE INDEX `Sku_Title` ON `shop`.`Product` (`Sku`,`Title`);"
    );
}

#[test]
fn drop_table_if_exists() {
    let session = session();

    session.drop_table_if_exists::<Store>().expect("drop");

    assert_eq!(
        session.executor().last().sql,
        "DROP TABLE IF EXISTS `shop`.`Store`;"
    );
}

#[test]
fn hierarchical_backend_refuses_relational_work() {
    let config = Config::new("shop").with_backend(Backend::Hierarchical);
    let session = Session::new(MockExecutor::default(), config);

    let err = session.migrate::<Product>().unwrap_err();

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert!(session.executor().statements().is_empty());
}

#[test]
fn config_document_rejects_unknown_settings() {
    assert!(Config::from_toml_str("page_limit = 5").is_err());

    let config = Config::from_toml_str(
        r#"
        schema = "shop"
        backend = "hierarchical"
        debug = true
        "#,
    )
    .expect("config");
    assert_eq!(config.backend, Backend::Hierarchical);
    assert!(config.debug);
}

#[derive(Default, Record, Entity)]
struct Shadowing {
    #[loquat("$Parent")]
    parent: String,
}

#[test]
fn reserved_column_name_is_a_configuration_error() {
    let session = session();

    let err = session.migrate::<Shadowing>().unwrap_err();

    assert_eq!(err.class, ErrorClass::Configuration);
    assert!(err.message.contains("$Parent"));
    assert!(session.executor().statements().is_empty());
}
