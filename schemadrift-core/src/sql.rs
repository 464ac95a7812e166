//! SQL rendering for change lists.

use crate::classify::SafetyLevel;
use crate::diff::Change;
use crate::snapshot::{
    Column, Constraint, ConstraintKind, Index, QualifiedName, Sequence, is_plain_identifier,
    quote_ident,
};

/// Render `changes` as a SQL script under the given safety level.
pub fn render(changes: &[Change], level: SafetyLevel) -> String {
    SqlRenderer::new(level).render(changes)
}

/// The statements of `changes` that execute under `level`, without comments.
pub fn render_statements(changes: &[Change], level: SafetyLevel) -> Vec<String> {
    SqlRenderer::new(level).executable_statements(changes)
}

/// Renders an ordered change list as PostgreSQL DDL.
///
/// Statements whose tier is not allowed by the safety level are still
/// printed, but commented out, so the script doubles as a review document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlRenderer {
    level: SafetyLevel,
}

impl SqlRenderer {
    /// Create a renderer for the given level.
    pub fn new(level: SafetyLevel) -> Self {
        Self { level }
    }

    /// The configured safety level.
    pub fn level(&self) -> SafetyLevel {
        self.level
    }

    /// Render the full script. Blocks are separated by one blank line; an
    /// empty change list renders as an empty string.
    pub fn render(&self, changes: &[Change]) -> String {
        changes
            .iter()
            .map(|change| self.block(change))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Only the statements that would run at this level, in order.
    pub fn executable_statements(&self, changes: &[Change]) -> Vec<String> {
        changes
            .iter()
            .filter(|change| self.level.executes(change.tier()))
            .map(Change::statement)
            .collect()
    }

    fn block(&self, change: &Change) -> String {
        let mut block = String::new();

        if let Change::DropIndex {
            index,
            recreated: true,
        } = change
        {
            block.push_str(&format!("-- Index {} needs to be changed\n\n", index));
        }

        if let Change::AlterColumnType { previous, .. } = change {
            block.push_str(&format!("-- Previous data type was {}\n", previous));
        }

        let statement = change.statement();
        if self.level.executes(change.tier()) {
            block.push_str(&statement);
        } else {
            block.push_str(&comment_out(&statement));
        }

        block
    }
}

fn comment_out(statement: &str) -> String {
    statement
        .lines()
        .map(|line| format!("-- {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Change {
    /// The bare SQL statement for this change, without advisory comments.
    pub fn statement(&self) -> String {
        match self {
            Change::CreateSchema { schema } => {
                format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(schema))
            }
            Change::DropSchema { schema } => {
                format!("DROP SCHEMA IF EXISTS {} CASCADE;", quote_ident(schema))
            }
            Change::CreateTable { table, columns } => create_table(table, columns),
            Change::DropTable { table } => format!("DROP TABLE IF EXISTS {} CASCADE;", table),
            Change::AddColumn { table, column } => format!(
                "ALTER TABLE {} ADD COLUMN {};",
                table,
                column_definition(column)
            ),
            Change::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table,
                quote_ident(column)
            ),
            Change::AlterColumnType {
                table,
                column,
                data_type,
                ..
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {};",
                table,
                quote_ident(column),
                data_type
            ),
            Change::SetNotNull { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;",
                table,
                quote_ident(column)
            ),
            Change::DropNotNull { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;",
                table,
                quote_ident(column)
            ),
            Change::CreateIndex { table, index } => create_index(table, index),
            Change::DropIndex { index, .. } => format!("DROP INDEX {};", index),
            Change::AddConstraint { table, constraint } => add_constraint(table, constraint),
            Change::DropConstraint { table, constraint } => format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                table,
                quote_ident(constraint)
            ),
            Change::CreateSequence(sequence) => create_sequence(sequence),
            Change::DropSequence { sequence } => {
                format!("DROP SEQUENCE IF EXISTS {} CASCADE;", sequence)
            }
        }
    }
}

/// Generate CREATE TABLE with one column per line.
fn create_table(table: &QualifiedName, columns: &[Column]) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| format!("  {}", column_definition(c)))
        .collect();
    format!("CREATE TABLE {} (\n{}\n);", table, columns.join(",\n"))
}

/// `"name" type [DEFAULT expr] NULL|NOT NULL`
fn column_definition(column: &Column) -> String {
    let mut def = format!("{} {}", quote_ident(&column.name), column.data_type);
    if let Some(default) = &column.default_value {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
    def
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Plain column names are quoted; expression keys are emitted verbatim.
fn index_keys(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| {
            if is_plain_identifier(c) {
                quote_ident(c)
            } else {
                c.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_index(table: &QualifiedName, index: &Index) -> String {
    let mut sql = format!(
        "CREATE INDEX {} ON {} USING {} ({})",
        quote_ident(&index.name),
        table,
        index.method,
        index_keys(&index.columns)
    );
    if let Some(predicate) = &index.predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    sql.push(';');
    sql
}

fn add_constraint(table: &QualifiedName, constraint: &Constraint) -> String {
    let body = match constraint.kind {
        ConstraintKind::Primary => format!("PRIMARY KEY ({})", quoted_list(&constraint.columns)),
        ConstraintKind::Unique => format!("UNIQUE ({})", quoted_list(&constraint.columns)),
        ConstraintKind::Foreign => {
            let mut body = format!("FOREIGN KEY ({})", quoted_list(&constraint.columns));
            if let Some(reference) = &constraint.references {
                body.push_str(&format!(
                    " REFERENCES {} ({})",
                    reference.table_name(),
                    quoted_list(&reference.columns)
                ));
            }
            let actions = constraint.on_actions.trim();
            if !actions.is_empty() {
                body.push(' ');
                body.push_str(actions);
            }
            body
        }
    };
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {};",
        table,
        quote_ident(&constraint.name),
        body
    )
}

fn create_sequence(sequence: &Sequence) -> String {
    format!(
        "CREATE SEQUENCE {} INCREMENT {} MINVALUE {} MAXVALUE {} START {} {};",
        sequence.qualified_name(),
        sequence.increment,
        sequence.minimum_value,
        sequence.maximum_value,
        sequence.start_value,
        if sequence.cycle { "CYCLE" } else { "NO CYCLE" }
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::snapshot::ForeignReference;

    fn users() -> QualifiedName {
        QualifiedName::new("public", "users")
    }

    #[test]
    fn test_empty_change_list_renders_nothing() {
        for level in SafetyLevel::ALL {
            assert_eq!(render(&[], level), "");
        }
    }

    #[test]
    fn test_create_table() {
        let change = Change::CreateTable {
            table: users(),
            columns: vec![
                Column::new("id", "integer")
                    .not_null()
                    .default_value("nextval('users_id_seq'::regclass)"),
                Column::new("email", "character varying(255)"),
            ],
        };
        assert_eq!(
            change.statement(),
            "CREATE TABLE \"public\".\"users\" (\n  \"id\" integer DEFAULT nextval('users_id_seq'::regclass) NOT NULL,\n  \"email\" character varying(255) NULL\n);"
        );
    }

    #[test]
    fn test_add_column() {
        let change = Change::AddColumn {
            table: users(),
            column: Column::new("num", "numeric(15,10)"),
        };
        assert_eq!(
            change.statement(),
            "ALTER TABLE \"public\".\"users\" ADD COLUMN \"num\" numeric(15,10) NULL;"
        );
    }

    #[test]
    fn test_drop_column_commented_at_warn_and_safe() {
        let changes = vec![Change::DropColumn {
            table: users(),
            column: "first_name".to_string(),
        }];
        assert_eq!(
            render(&changes, SafetyLevel::Drop),
            "ALTER TABLE \"public\".\"users\" DROP COLUMN \"first_name\";"
        );
        for level in [SafetyLevel::Warn, SafetyLevel::Safe] {
            assert_eq!(
                render(&changes, level),
                "-- ALTER TABLE \"public\".\"users\" DROP COLUMN \"first_name\";"
            );
        }
    }

    #[test]
    fn test_alter_type_keeps_advisory_line() {
        let changes = vec![Change::AlterColumnType {
            table: QualifiedName::new("public", "tab_with_num"),
            column: "num".to_string(),
            data_type: "numeric(20,10)".to_string(),
            previous: "numeric(10,5)".to_string(),
        }];
        assert_eq!(
            render(&changes, SafetyLevel::Warn),
            "-- Previous data type was numeric(10,5)\nALTER TABLE \"public\".\"tab_with_num\" ALTER COLUMN \"num\" SET DATA TYPE numeric(20,10);"
        );
        assert_eq!(
            render(&changes, SafetyLevel::Safe),
            "-- Previous data type was numeric(10,5)\n-- ALTER TABLE \"public\".\"tab_with_num\" ALTER COLUMN \"num\" SET DATA TYPE numeric(20,10);"
        );
    }

    #[test]
    fn test_partial_gin_index() {
        let change = Change::CreateIndex {
            table: users(),
            index: Index::new("public", "users_tags", ["tags"])
                .method("gin")
                .predicate("(tags IS NOT NULL)"),
        };
        assert_eq!(
            change.statement(),
            "CREATE INDEX \"users_tags\" ON \"public\".\"users\" USING gin (\"tags\") WHERE (tags IS NOT NULL);"
        );
    }

    #[test]
    fn test_expression_index_keys_are_not_quoted() {
        let change = Change::CreateIndex {
            table: users(),
            index: Index::new("public", "users_lower_email", ["lower((email)::text)", "id"]),
        };
        assert_eq!(
            change.statement(),
            "CREATE INDEX \"users_lower_email\" ON \"public\".\"users\" USING btree (lower((email)::text), \"id\");"
        );
    }

    #[test]
    fn test_foreign_key_with_actions() {
        let change = Change::AddConstraint {
            table: QualifiedName::new("public", "items"),
            constraint: Constraint::foreign(
                "public",
                "items_fk2",
                ["user_id"],
                ForeignReference::new("public", "users", ["id"]),
            )
            .on_actions("ON UPDATE CASCADE ON DELETE SET NULL"),
        };
        assert_eq!(
            change.statement(),
            "ALTER TABLE \"public\".\"items\" ADD CONSTRAINT \"items_fk2\" FOREIGN KEY (\"user_id\") REFERENCES \"public\".\"users\" (\"id\") ON UPDATE CASCADE ON DELETE SET NULL;"
        );
    }

    #[test]
    fn test_sequence_statements() {
        let sequence = Sequence::new("public", "users_id_seq").data_type("integer", "2147483647");
        assert_eq!(
            Change::CreateSequence(sequence).statement(),
            "CREATE SEQUENCE \"public\".\"users_id_seq\" INCREMENT 1 MINVALUE 1 MAXVALUE 2147483647 START 1 NO CYCLE;"
        );
        let drop = Change::DropSequence {
            sequence: QualifiedName::new("public", "seq_name"),
        };
        assert_eq!(
            drop.statement(),
            "DROP SEQUENCE IF EXISTS \"public\".\"seq_name\" CASCADE;"
        );
    }

    #[test]
    fn test_executable_statements_skip_commented_changes() {
        let changes = vec![
            Change::AddColumn {
                table: users(),
                column: Column::new("bio", "text"),
            },
            Change::SetNotNull {
                table: users(),
                column: "email".to_string(),
            },
            Change::DropColumn {
                table: users(),
                column: "age".to_string(),
            },
        ];

        assert_eq!(SqlRenderer::new(SafetyLevel::Drop).executable_statements(&changes).len(), 3);
        assert_eq!(SqlRenderer::new(SafetyLevel::Warn).executable_statements(&changes).len(), 2);
        assert_eq!(
            SqlRenderer::new(SafetyLevel::Safe).executable_statements(&changes),
            vec!["ALTER TABLE \"public\".\"users\" ADD COLUMN \"bio\" text NULL;".to_string()]
        );
    }
}
