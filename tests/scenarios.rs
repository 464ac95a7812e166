//! End-to-end scenarios: snapshot pair in, rendered SQL out.

use pretty_assertions::assert_eq;
use schemadrift::core::{Column, Constraint, ForeignReference, Index, Sequence, Table};
use schemadrift::{SafetyLevel, Snapshot, diff, render, render_statements};

fn users(columns: &[(&str, &str)]) -> Table {
    columns.iter().fold(Table::new("public", "users"), |table, (name, data_type)| {
        table.column_def(Column::new(*name, *data_type))
    })
}

fn sql(a: &Snapshot, b: &Snapshot, level: SafetyLevel) -> String {
    render(&diff(a, b), level)
}

/// A new table in a new schema creates both.
#[test]
fn test_create_table() {
    let a = Snapshot::new();
    let b = Snapshot::new().with_table(users(&[("email", "character varying(255)")]));

    assert_eq!(
        sql(&a, &b, SafetyLevel::Drop),
        "CREATE SCHEMA IF NOT EXISTS \"public\";\n\n\
         CREATE TABLE \"public\".\"users\" (\n  \
         \"email\" character varying(255) NULL\n\
         );"
    );
}

/// Dropping the last table of a schema drops the schema too, and both are
/// commented out below the drop level.
#[test]
fn test_drop_table() {
    let a = Snapshot::new().with_table(users(&[("email", "character varying(255)")]));
    let b = Snapshot::new();

    let drop = sql(&a, &b, SafetyLevel::Drop);
    assert!(drop.contains("DROP SCHEMA IF EXISTS \"public\" CASCADE;"));
    assert!(drop.contains("DROP TABLE IF EXISTS \"public\".\"users\" CASCADE;"));

    for level in [SafetyLevel::Warn, SafetyLevel::Safe] {
        assert_eq!(
            sql(&a, &b, level),
            "-- DROP SCHEMA IF EXISTS \"public\" CASCADE;\n\n\
             -- DROP TABLE IF EXISTS \"public\".\"users\" CASCADE;"
        );
    }
}

/// A type change carries the previous type as an advisory comment.
#[test]
fn test_change_column_type() {
    let a = Snapshot::new().with_table(users(&[("first_name", "character varying(200)")]));
    let b = Snapshot::new().with_table(users(&[("first_name", "character varying(255)")]));

    let executed = "-- Previous data type was character varying(200)\n\
                    ALTER TABLE \"public\".\"users\" ALTER COLUMN \"first_name\" \
                    SET DATA TYPE character varying(255);";
    assert_eq!(sql(&a, &b, SafetyLevel::Drop), executed);
    assert_eq!(sql(&a, &b, SafetyLevel::Warn), executed);
    assert_eq!(
        sql(&a, &b, SafetyLevel::Safe),
        "-- Previous data type was character varying(200)\n\
         -- ALTER TABLE \"public\".\"users\" ALTER COLUMN \"first_name\" \
         SET DATA TYPE character varying(255);"
    );
}

/// A changed index is dropped and recreated at every level.
#[test]
fn test_recreate_index() {
    let table = users(&[
        ("first_name", "character varying(255)"),
        ("last_name", "character varying(255)"),
    ]);
    let a = Snapshot::new()
        .with_table(table.clone().index(Index::new("public", "some_index", ["first_name"])));
    let b = Snapshot::new()
        .with_table(table.index(Index::new("public", "some_index", ["last_name"])));

    for level in SafetyLevel::ALL {
        assert_eq!(
            sql(&a, &b, level),
            "-- Index \"public\".\"some_index\" needs to be changed\n\n\
             DROP INDEX \"public\".\"some_index\";\n\n\
             CREATE INDEX \"some_index\" ON \"public\".\"users\" USING btree (\"last_name\");"
        );
    }
}

/// A constraint redefined under the same name is dropped, then re-added.
#[test]
fn test_same_name_constraint() {
    let table = users(&[
        ("first_name", "character varying(255)"),
        ("last_name", "character varying(255)"),
    ]);
    let a = Snapshot::new().with_table(
        table
            .clone()
            .constraint(Constraint::unique("public", "a_unique_constraint", ["first_name"])),
    );
    let b = Snapshot::new().with_table(
        table.constraint(Constraint::unique("public", "a_unique_constraint", ["last_name"])),
    );

    let drop = "ALTER TABLE \"public\".\"users\" DROP CONSTRAINT \"a_unique_constraint\";";
    let add = "ALTER TABLE \"public\".\"users\" ADD CONSTRAINT \"a_unique_constraint\" \
               UNIQUE (\"last_name\");";

    assert_eq!(sql(&a, &b, SafetyLevel::Drop), format!("{drop}\n\n{add}"));
    assert_eq!(sql(&a, &b, SafetyLevel::Safe), format!("{drop}\n\n-- {add}"));
    assert_eq!(
        render_statements(&diff(&a, &b), SafetyLevel::Safe),
        vec![drop.to_string()]
    );
}

/// Serial columns bring their sequence along, created before the table.
#[test]
fn test_serial_column() {
    let a = Snapshot::new().with_table(users(&[("email", "character varying(255)")]));
    let b = Snapshot::new()
        .with_table(
            Table::new("public", "users")
                .column_def(
                    Column::new("id", "integer")
                        .not_null()
                        .default_value("nextval('users_id_seq'::regclass)"),
                )
                .column_def(Column::new("email", "character varying(255)")),
        )
        .with_sequence(Sequence::new("public", "users_id_seq").data_type("integer", "2147483647"));

    assert_eq!(
        sql(&a, &b, SafetyLevel::Drop),
        "CREATE SEQUENCE \"public\".\"users_id_seq\" INCREMENT 1 MINVALUE 1 \
         MAXVALUE 2147483647 START 1 NO CYCLE;\n\n\
         ALTER TABLE \"public\".\"users\" ADD COLUMN \"id\" integer \
         DEFAULT nextval('users_id_seq'::regclass) NOT NULL;"
    );
}

/// Numeric precision is part of the type and is diffed like any other type.
#[test]
fn test_numeric_precision() {
    let table = |data_type: &str| {
        Snapshot::new().with_table(
            Table::new("public", "items").column_def(Column::new("price", data_type)),
        )
    };

    assert_eq!(
        sql(&table("numeric(10,2)"), &table("numeric(12,4)"), SafetyLevel::Drop),
        "-- Previous data type was numeric(10,2)\n\
         ALTER TABLE \"public\".\"items\" ALTER COLUMN \"price\" SET DATA TYPE numeric(12,4);"
    );
    assert_eq!(sql(&table("numeric(10,2)"), &table("numeric(10,2)"), SafetyLevel::Drop), "");
}

/// Nullability changes in both directions.
#[test]
fn test_nullability() {
    let nullable = Snapshot::new().with_table(users(&[("email", "text")]));
    let required = Snapshot::new().with_table(
        Table::new("public", "users").column_def(Column::new("email", "text").not_null()),
    );

    assert_eq!(
        sql(&nullable, &required, SafetyLevel::Safe),
        "-- ALTER TABLE \"public\".\"users\" ALTER COLUMN \"email\" SET NOT NULL;"
    );
    assert_eq!(
        sql(&required, &nullable, SafetyLevel::Safe),
        "ALTER TABLE \"public\".\"users\" ALTER COLUMN \"email\" DROP NOT NULL;"
    );
}

/// Keys are added before the foreign keys that reference them.
#[test]
fn test_constraint_types() {
    let a = Snapshot::new()
        .with_table(Table::new("public", "users").column_def(Column::new("id", "integer").not_null()))
        .with_table(
            Table::new("public", "items")
                .column_def(Column::new("id", "integer").not_null())
                .column_def(Column::new("code", "text"))
                .column_def(Column::new("user_id", "integer")),
        );
    let b = Snapshot::new()
        .with_table(
            Table::new("public", "users")
                .column_def(Column::new("id", "integer").not_null())
                .constraint(Constraint::primary("public", "users_pk", ["id"])),
        )
        .with_table(
            Table::new("public", "items")
                .column_def(Column::new("id", "integer").not_null())
                .column_def(Column::new("code", "text"))
                .column_def(Column::new("user_id", "integer"))
                .constraint(
                    Constraint::foreign(
                        "public",
                        "items_fk",
                        ["user_id"],
                        ForeignReference::new("public", "users", ["id"]),
                    )
                    .on_actions("ON UPDATE CASCADE ON DELETE SET NULL"),
                )
                .constraint(Constraint::unique("public", "items_code", ["code"]))
                .constraint(Constraint::primary("public", "items_pk", ["id"])),
        );

    insta::assert_snapshot!(sql(&a, &b, SafetyLevel::Drop), @r#"
ALTER TABLE "public"."items" ADD CONSTRAINT "items_pk" PRIMARY KEY ("id");

ALTER TABLE "public"."users" ADD CONSTRAINT "users_pk" PRIMARY KEY ("id");

ALTER TABLE "public"."items" ADD CONSTRAINT "items_code" UNIQUE ("code");

ALTER TABLE "public"."items" ADD CONSTRAINT "items_fk" FOREIGN KEY ("user_id") REFERENCES "public"."users" ("id") ON UPDATE CASCADE ON DELETE SET NULL;
"#);
}

/// An unchanged schema renders as an empty string.
#[test]
fn test_empty_diff_renders_nothing() {
    let snapshot = Snapshot::new().with_table(users(&[("email", "text")]));
    for level in SafetyLevel::ALL {
        assert_eq!(sql(&snapshot, &snapshot, level), "");
    }
}
