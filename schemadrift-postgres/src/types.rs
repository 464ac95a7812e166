//! Catalog value normalisation.
//!
//! PostgreSQL reports the same information in several shapes depending on
//! the catalog view. These helpers turn catalog output into the canonical
//! forms stored in a snapshot.

use schemadrift_core::ForeignReference;

use crate::error::{PgError, PgResult};

/// Schema assumed for unqualified names in constraint definitions.
pub const DEFAULT_SCHEMA: &str = "public";

/// Type columns of one `information_schema.columns` row.
#[derive(Debug, Clone, Default)]
pub struct ColumnType<'a> {
    /// `data_type`.
    pub data_type: &'a str,
    /// `udt_name`.
    pub udt_name: &'a str,
    /// `character_maximum_length`.
    pub character_maximum_length: Option<i32>,
    /// `numeric_precision`.
    pub numeric_precision: Option<i32>,
    /// `numeric_scale`.
    pub numeric_scale: Option<i32>,
}

impl ColumnType<'_> {
    /// Canonical type text: `elem[]` for arrays, the UDT name for
    /// user-defined types, and length or precision/scale suffixes.
    pub fn normalize(&self) -> String {
        let mut ty = match self.data_type {
            "ARRAY" => format!("{}[]", self.udt_name.strip_prefix('_').unwrap_or(self.udt_name)),
            "USER-DEFINED" => self.udt_name.to_string(),
            other => other.to_string(),
        };

        if let Some(len) = self.character_maximum_length {
            ty.push_str(&format!("({})", len));
        } else if self.data_type == "numeric" {
            if let Some(precision) = self.numeric_precision {
                ty.push_str(&format!("({},{})", precision, self.numeric_scale.unwrap_or(0)));
            }
        }

        ty
    }
}

/// Strip one level of identifier quoting, undoubling embedded quotes.
pub fn unquote(s: &str) -> String {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => s.to_string(),
    }
}

/// Split on `sep` outside double-quoted identifiers. Parts are trimmed.
fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(s[start..i].trim());
            start = i + c.len_utf8();
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Parse a comma-separated identifier list such as `id, "Full Name"`.
pub fn parse_identifier_list(s: &str) -> Vec<String> {
    split_outside_quotes(s, ',')
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(unquote)
        .collect()
}

/// Split a possibly schema-qualified name, defaulting the schema.
pub fn split_qualified(name: &str) -> (String, String) {
    let parts = split_outside_quotes(name, '.');
    match parts.as_slice() {
        [schema, table] => (unquote(schema), unquote(table)),
        _ => (DEFAULT_SCHEMA.to_string(), unquote(name.trim())),
    }
}

/// Find the byte index of the `)` closing the `(` at `open`.
fn closing_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    for (i, c) in s[open..].char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The parts of a `pg_get_constraintdef` result a snapshot keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDefinition {
    /// Constrained columns.
    pub columns: Vec<String>,
    /// Referenced table and columns for foreign keys.
    pub references: Option<ForeignReference>,
    /// Trailing clause after the referenced column list, trimmed.
    pub on_actions: String,
}

/// Parse `pg_get_constraintdef` output.
///
/// Handles `PRIMARY KEY (a, b)`, `UNIQUE (a)` and
/// `FOREIGN KEY (a) REFERENCES [schema.]table(b) [ON ...]`. Unqualified
/// referenced tables are placed in the `public` schema.
pub fn parse_constraint_definition(definition: &str) -> PgResult<ConstraintDefinition> {
    let malformed = || PgError::catalog(format!("malformed constraint definition: {}", definition));

    let open = definition.find('(').ok_or_else(malformed)?;
    let close = closing_paren(definition, open).ok_or_else(malformed)?;
    let columns = parse_identifier_list(&definition[open + 1..close]);

    let rest = &definition[close + 1..];
    let Some(at) = rest.find("REFERENCES") else {
        return Ok(ConstraintDefinition {
            columns,
            references: None,
            on_actions: String::new(),
        });
    };

    let target = &rest[at + "REFERENCES".len()..];
    let open = target.find('(').ok_or_else(malformed)?;
    let close = closing_paren(target, open).ok_or_else(malformed)?;

    let (schema, table) = split_qualified(&target[..open]);
    let referenced = parse_identifier_list(&target[open + 1..close]);

    Ok(ConstraintDefinition {
        columns,
        references: Some(ForeignReference::new(schema, table, referenced)),
        on_actions: target[close + 1..].trim().to_string(),
    })
}
