use std::sync::Arc;

use relata_core::{Column, Error, Expr, KeyKind, Named, Result, Row, Table, Value};
use relata_translate::{
    Catalog, Dialect, Fields, JoinDirection, MemoryCatalog, Modifiers, MySql, QueryOutput, Request,
    Translator,
};

/// MySQL rules with single-quoted identifiers, to match the documented text shapes.
struct Quoted;

impl Dialect for Quoted {
    fn name(&self) -> &'static str {
        "quoted"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("'{ident}'")
    }

    fn escape_string(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }

    fn dtypes(&self) -> &'static [&'static str] {
        MySql.dtypes()
    }

    fn describe_definition(&self, row: &Row) -> Result<String> {
        MySql.describe_definition(row)
    }
}

fn catalog() -> MemoryCatalog {
    let t = Table::new(
        "t",
        vec![
            Column::new("col", "int"),
            Column::new("other", "text"),
        ],
    )
    .expect("table t");
    let users = Table::new(
        "users",
        vec![
            Column::new("id", "int").with_key(KeyKind::Primary).with_auto_increment(true),
            Column::new("email", "varchar(255)").with_nullable(false),
            Column::new("nick", "varchar(32)"),
        ],
    )
    .expect("table users");
    let orders = Table::new(
        "orders",
        vec![
            Column::new("id", "int").with_key(KeyKind::Primary),
            Column::new("user_id", "int").with_nullable(false),
            Column::new("total", "double"),
        ],
    )
    .expect("table orders");
    MemoryCatalog::new(vec![t, users, orders])
}

fn translate(request: Request) -> String {
    let translator = Translator::new(Quoted);
    let catalog = catalog();
    translator
        .validate_and_raise(&catalog, &request)
        .expect("request should validate");
    translator
        .translate(&catalog, &request)
        .expect("request should translate")
}

fn validation_error(request: Request) -> Error {
    Translator::new(Quoted)
        .validate_and_raise(&catalog(), &request)
        .expect_err("request should fail validation")
}

fn column(table: &str, name: &str) -> Column {
    catalog()
        .table(table)
        .and_then(|table| table.column(name).cloned())
        .expect("column in catalog")
}

#[test]
fn documented_text_shapes() {
    assert_eq!(translate(Request::new("select", "t").with_fields("all")), "select * from 't';");
    assert_eq!(
        translate(
            Request::new("select", "t")
                .with_fields("all")
                .with_modifiers(Modifiers::default().with_group_by("col"))
        ),
        "select * from 't' group by t.col;"
    );
    assert_eq!(
        translate(Request::new("insert", "t").with_fields(Fields::values([("col", 5)]))),
        "insert into 't' (col) values (5);"
    );
    assert_eq!(
        translate(Request::new("create table", "fresh").with_fields("col int")),
        "create table 'fresh' if not exists (col int);"
    );
    assert_eq!(translate(Request::new("drop table", "t")), "drop table 't' if exists;");
}

#[test]
fn clauses_follow_fixed_order() {
    let col = column("t", "col");
    let modifiers = Modifiers {
        limit: Some(3),
        order_by: Some("other".into()),
        group_by: Some(col.clone().into()),
        where_clause: Some(relata_core::expr::lt(&col, 0)),
        ..Modifiers::default()
    };
    assert_eq!(
        translate(Request::new("select", "t").with_fields("all").with_modifiers(modifiers)),
        "select * from 't' where (t.col < 0) group by t.col order by t.other limit 3;"
    );
}

#[test]
fn data_methods() {
    let col = column("t", "col");
    assert_eq!(
        translate(
            Request::new("update", "t")
                .with_fields(Fields::values([("col", Value::Int(1)), ("other", Value::from("it's"))]))
                .with_modifiers(Modifiers::default().with_where(relata_core::expr::eq(&col, 0)))
        ),
        "update 't' set col = 1, other = 'it''s' where (t.col = 0);"
    );
    assert_eq!(
        translate(
            Request::new("delete", "t")
                .with_modifiers(Modifiers::default().with_where(relata_core::expr::lt(&col, 0)))
        ),
        "delete from 't' where (t.col < 0);"
    );
    assert_eq!(
        translate(Request::new("select distinct", "t").with_fields(Fields::columns(["col", "other"]))),
        "select distinct col, other from 't';"
    );
    assert_eq!(translate(Request::new("count", "t")), "select count(*) from 't';");
    assert_eq!(translate(Request::new("show tables", "")), "show tables;");
    assert_eq!(translate(Request::new("describe", "t")), "describe 't';");
    assert_eq!(translate(Request::new("truncate", "t")), "truncate table 't';");
}

#[test]
fn inapplicable_modifiers_are_ignored() {
    let modifiers = Modifiers {
        limit: Some(-1),
        order_by: Some("nowhere".into()),
        where_clause: Some(Expr::from(1)),
        ..Modifiers::default()
    };
    assert_eq!(
        translate(Request::new("truncate", "t").with_modifiers(modifiers)),
        "truncate table 't';"
    );
}

#[test]
fn schema_methods() {
    assert_eq!(
        translate(
            Request::new("create temporary table", "scratch")
                .with_fields(Fields::columns(["a int", "b text"]))
                .with_modifiers(Modifiers::default().with_clobber(true))
        ),
        "create temporary table 'scratch' (a int, b text);"
    );
    assert_eq!(
        translate(Request::new("drop temporary table", "t")),
        "drop temporary table 't' if exists;"
    );
    assert_eq!(
        translate(Request::new("rename table", "t").with_fields("renamed")),
        "alter table 't' rename 'renamed';"
    );
    assert_eq!(
        translate(Request::new("add column", "t").with_fields("extra int")),
        "alter table 't' add column extra int;"
    );
    assert_eq!(
        translate(
            Request::new("add column", "t")
                .with_fields("extra int")
                .with_modifiers(Modifiers::default().with_after("first"))
        ),
        "alter table 't' add column extra int first;"
    );
    assert_eq!(
        translate(
            Request::new("create column", "t")
                .with_fields(Column::new("extra", "blob"))
                .with_modifiers(Modifiers::default().with_after("col"))
        ),
        "alter table 't' add column extra blob null after col;"
    );
    assert_eq!(
        translate(Request::new("drop column", "t").with_fields("col")),
        "alter table 't' drop column 'col';"
    );
    assert_eq!(
        translate(
            Request::new("alter column", "t")
                .with_fields("col")
                .with_modifiers(Modifiers::default().with_to("altered text"))
        ),
        "alter table 't' change column 'col' altered text;"
    );
}

#[test]
fn create_from_table_value() {
    let table = Table::new(
        "fresh",
        vec![Column::new("id", "int").with_key(KeyKind::Primary), Column::new("note", "text")],
    )
    .expect("fresh table")
    .with_temporary(true);
    assert_eq!(
        translate(Request::new("create table", table)),
        "create temporary table 'fresh' if not exists (id int not null primary key, note text null);"
    );
}

#[test]
fn create_splits_comma_separated_definitions() {
    assert_eq!(
        translate(Request::new("create table", "fresh").with_fields("a int, b text")),
        "create table 'fresh' if not exists (a int, b text);"
    );
    assert_eq!(
        translate(
            Request::new("create table", "fresh")
                .with_fields("note text comment 'a, b', price decimal(10,2)")
        ),
        "create table 'fresh' if not exists (note text comment 'a, b', price decimal(10,2));"
    );
    assert!(matches!(
        validation_error(Request::new("create table", "fresh").with_fields("a int, a text")),
        Error::SemanticField(message) if message.contains("duplicate column name: a")
    ));
    assert!(
        validation_error(Request::new("create table", "fresh").with_fields("a int, b nonsense"))
            .is_structural()
    );
}

#[test]
fn if_not_exists_in_method_survives_clobber() {
    assert_eq!(
        translate(
            Request::new("create table if not exists", "fresh")
                .with_fields("col int")
                .with_modifiers(Modifiers::default().with_clobber(true))
        ),
        "create table 'fresh' if not exists (col int);"
    );
    assert_eq!(
        translate(
            Request::new("create table", "fresh")
                .with_fields("col int")
                .with_modifiers(Modifiers::default().with_clobber(true))
        ),
        "create table 'fresh' (col int);"
    );
}

#[test]
fn mysql_quotes_column_identifiers_that_are_not_bare() {
    let ledger = Table::new(
        "ledger",
        vec![
            Column::new("user id", "int").with_nullable(false),
            Column::new("total", "double"),
        ],
    )
    .expect("ledger table");
    let spaced = ledger.column("user id").cloned().expect("spaced column");
    let catalog = MemoryCatalog::new(vec![ledger]);
    let translator = Translator::new(MySql);
    let translate = |request: Request| {
        translator
            .validate_and_raise(&catalog, &request)
            .expect("request should validate");
        translator
            .translate(&catalog, &request)
            .expect("request should translate")
    };

    assert_eq!(
        translate(Request::new("select", "ledger").with_fields("user id")),
        "select `user id` from `ledger`;"
    );
    assert_eq!(
        translate(
            Request::new("select", "ledger")
                .with_fields(Fields::columns(["user id", "total"]))
                .with_modifiers(
                    Modifiers::default()
                        .with_where(relata_core::expr::eq(&spaced, 1))
                        .with_order_by("user id")
                )
        ),
        "select `user id`, total from `ledger` where (ledger.`user id` = 1) order by ledger.`user id`;"
    );
    assert_eq!(
        translate(Request::new("insert", "ledger").with_fields(Fields::values([("user id", 1)]))),
        "insert into `ledger` (`user id`) values (1);"
    );
    assert_eq!(
        translate(Request::new("update", "ledger").with_fields(Fields::values([("user id", 2)]))),
        "update `ledger` set `user id` = 2;"
    );
    assert_eq!(
        translate(Request::new("add index", "ledger").with_fields("user id")),
        "alter table `ledger` add index (`user id`);"
    );
    assert_eq!(
        translate(Request::new("drop column", "ledger").with_fields("user id")),
        "alter table `ledger` drop column `user id`;"
    );
}

#[test]
fn constraint_methods() {
    assert_eq!(
        translate(Request::new("add index", "t").with_fields("col")),
        "alter table 't' add index (col);"
    );
    assert_eq!(
        translate(
            Request::new("add unique", "users")
                .with_fields("email")
                .with_modifiers(Modifiers::default().with_name("uq_email"))
        ),
        "alter table 'users' add constraint uq_email unique (email);"
    );
    assert_eq!(
        translate(
            Request::new("add foreign key", "orders")
                .with_fields("user_id")
                .with_modifiers(Modifiers::default().with_foreign("users.id").with_name("fk_foobar"))
        ),
        "alter table 'orders' add constraint fk_foobar foreign key (user_id) references 'users' (id);"
    );
    assert_eq!(
        translate(
            Request::new("add foreign", "orders")
                .with_fields("user_id")
                .with_modifiers(Modifiers::default().with_foreign(column("users", "id")))
        ),
        "alter table 'orders' add constraint fk_orders_user_id_id foreign key (user_id) references 'users' (id);"
    );

    let primary = column("users", "id")
        .find_constraint("primary")
        .cloned()
        .expect("primary key");
    assert_eq!(
        translate(Request::new("drop constraint", "users").with_fields(primary)),
        "alter table 'users' drop primary key;"
    );
}

#[test]
fn join_renders_as_table_source() {
    let translator = Translator::new(Quoted);
    let mut catalog = catalog();
    let left = catalog.table("t").expect("t");
    let right = Table::new("new_table", vec![Column::new("col", "int")]).expect("new_table");
    catalog.insert(right.clone());

    let on = translator.eq(&left.columns()[0], &right.columns()[0]);
    let joined = translator
        .join(&left, &right, on, JoinDirection::Inner, None)
        .expect("join");
    assert_eq!(joined.name(), "t inner join new_table on (t.col = new_table.col)");
    assert!(joined.column("new_table.col").is_some());

    let request = Request::new("select", Arc::new(joined))
        .with_fields("all")
        .with_modifiers(Modifiers::default().with_order_by(left.columns()[1].clone()));
    translator
        .validate_and_raise(&catalog, &request)
        .expect("join validates");
    assert_eq!(
        translator.translate(&catalog, &request).expect("translate"),
        "select * from t inner join new_table on (t.col = new_table.col) order by t.other;"
    );
}

#[test]
fn join_requires_a_predicate() {
    let translator = Translator::new(Quoted);
    let table = Table::new("a", vec![Column::new("x", "int")]).expect("a");
    let other = Table::new("b", vec![Column::new("x", "int")]).expect("b");
    let err = translator
        .join(&table, &other, translator.add(&table.columns()[0], 1), JoinDirection::Left, None)
        .expect_err("arithmetic is not a predicate");
    assert!(err.is_structural());
}

#[test]
fn precondition_errors_come_first() {
    let translator = Translator::new(Quoted);
    let request = Request::new("bogus", "missing").with_fields(Fields::All);
    assert_eq!(
        translator.validate_and_raise(&MemoryCatalog::closed(), &request),
        Err(Error::ConnectionNotOpen)
    );
    assert!(matches!(validation_error(request), Error::InvalidMethod(_)));
    assert!(matches!(
        validation_error(Request::new("select", "missing")),
        Error::InvalidTableReference(_)
    ));
    assert!(matches!(
        validation_error(Request::new("create table", "t").with_fields("a int")),
        Error::InvalidTableReference(_)
    ));
    assert!(matches!(
        validation_error(Request::new("add foreign index", "t").with_fields("col")),
        Error::InvalidMethod(_)
    ));
}

#[test]
fn structural_errors_precede_semantic_ones() {
    // Unknown column (semantic) alongside an arithmetic where clause (structural).
    let col = column("t", "col");
    let request = Request::new("select", "t")
        .with_fields("missing")
        .with_modifiers(Modifiers::default().with_where(Expr::from(&col) + 1));
    assert!(validation_error(request).is_structural());

    // Unknown column (semantic) alongside a bad definition (structural).
    let request = Request::new("alter column", "t")
        .with_fields("missing")
        .with_modifiers(Modifiers::default().with_to("broken nonsense-type"));
    assert!(validation_error(request).is_structural());

    // Insert with the wrong payload shape is structural even when the table misses required columns.
    assert!(validation_error(Request::new("insert", "users").with_fields("email")).is_structural());
}

#[test]
fn semantic_checks() {
    assert!(matches!(
        validation_error(Request::new("insert", "users").with_fields(Fields::values([("nick", "x")]))),
        Error::SemanticField(message) if message.contains("users.email")
    ));
    assert!(matches!(
        validation_error(Request::new("update", "t").with_fields(Fields::values([("nope", 1)]))),
        Error::SemanticField(_)
    ));
    assert!(matches!(
        validation_error(Request::new("rename table", "t").with_fields("users")),
        Error::SemanticField(_)
    ));
    assert!(matches!(
        validation_error(
            Request::new("create table", "dup").with_fields(Fields::columns(["a int", "a text"]))
        ),
        Error::SemanticField(_)
    ));
    assert!(matches!(
        validation_error(
            Request::new("select", "t")
                .with_fields("all")
                .with_modifiers(Modifiers::default().with_limit(0))
        ),
        Error::SemanticField(_)
    ));
    assert!(matches!(
        validation_error(
            Request::new("select", "t")
                .with_fields("all")
                .with_modifiers(Modifiers::default().with_group_by("nope"))
        ),
        Error::SemanticField(_)
    ));
    assert!(matches!(
        validation_error(Request::new("add column", "t").with_fields("col int")),
        Error::SemanticField(_)
    ));
}

#[test]
fn constraint_checks() {
    assert!(matches!(
        validation_error(Request::new("add primary", "t").with_fields("col")),
        Error::ConstraintViolation(_)
    ));
    assert!(matches!(
        validation_error(
            Request::new("add foreign", "t")
                .with_fields("col")
                .with_modifiers(Modifiers::default().with_foreign("t.other"))
        ),
        Error::ConstraintViolation(_)
    ));
    assert!(validation_error(
        Request::new("add foreign", "t")
            .with_fields("col")
            .with_modifiers(Modifiers::default().with_foreign("other"))
    )
    .is_structural());
    assert!(matches!(
        validation_error(
            Request::new("add index", "t")
                .with_fields("col")
                .with_modifiers(Modifiers::default().with_name("x".repeat(65)))
        ),
        Error::NameTooLong { max: 64, .. }
    ));
    assert!(validation_error(Request::new("drop constraint", "t").with_fields("col")).is_structural());

    let stranger = Column::new("col", "int").with_key(KeyKind::Unique);
    let unique = stranger.find_constraint("unique").cloned().expect("unique");
    assert!(matches!(
        validation_error(Request::new("drop constraint", "t").with_fields(unique)),
        Error::SemanticField(_)
    ));
}

#[test]
fn interpret_shapes_results() {
    let translator = Translator::new(Quoted);
    let count = Request::new("count", "t");
    assert_eq!(
        translator
            .interpret(&count, Some(vec![Row::from_pairs([("count(*)", Value::Int(4))])]))
            .expect("count"),
        QueryOutput::Scalar(Value::Int(4))
    );
    assert_eq!(
        translator.interpret(&count, None).expect("no rows"),
        QueryOutput::Empty
    );

    let tables = Request::new("show tables", "");
    assert_eq!(
        translator
            .interpret(
                &tables,
                Some(vec![
                    Row::from_pairs([("Tables_in_shop", "orders")]),
                    Row::from_pairs([("Tables_in_shop", "users")]),
                ])
            )
            .expect("tables")
            .into_names(),
        vec!["orders".to_string(), "users".to_string()]
    );

    let select = Request::new("select", "t").with_modifiers(Modifiers::default().with_max_rows(1));
    let rows = vec![
        Row::from_pairs([("col", 1)]),
        Row::from_pairs([("col", 2)]),
    ];
    assert_eq!(
        translator.interpret(&select, Some(rows)).expect("rows").into_rows().len(),
        1
    );

    let insert = Request::new("insert", "t");
    assert!(translator.interpret(&insert, Some(Vec::new())).expect("insert").is_empty());
}

#[test]
fn outputs_serialize_untagged() {
    let translator = Translator::new(Quoted);
    let select = Request::new("select", "t");
    let output = translator
        .interpret(
            &select,
            Some(vec![Row::from_pairs([("col", Value::Int(1)), ("other", Value::Null)])]),
        )
        .expect("rows");
    assert_eq!(
        serde_json::to_string(&output).expect("serialize"),
        r#"[{"col":1,"other":null}]"#
    );
    assert_eq!(
        serde_json::to_string(&QueryOutput::Scalar(Value::Int(3))).expect("serialize"),
        "3"
    );
}
