//! Parameterized statement construction.
//!
//! All statements produced here use `?` placeholders with values carried
//! alongside the text, so user data never lands in the SQL string.
//! Identifiers (table and column names) cannot be bound as parameters and
//! are double-quote escaped instead.
//!
//! WHERE predicates are column/value maps joined with `AND`. An empty map
//! means "all rows", matching the table-helper semantics of the public
//! query surface. A NULL value in a predicate compares with `IS NULL`,
//! since `= NULL` never matches in SQL.

use mirrorlite_types::{SqlMap, SqlValue};

/// A SQL statement plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Values to bind, one per placeholder.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// A statement with no bind values.
    pub const fn bare(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// Render a WHERE clause for an equality predicate map.
///
/// Returns the clause (including the leading ` WHERE `) and the values to
/// bind. Empty predicates render as an empty clause.
fn where_clause(predicate: &SqlMap) -> (String, Vec<SqlValue>) {
    if predicate.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut terms = Vec::with_capacity(predicate.len());
    let mut params = Vec::new();
    for (column, value) in predicate {
        if value.is_null() {
            terms.push(format!("{} IS NULL", quote_ident(column)));
        } else {
            terms.push(format!("{} = ?", quote_ident(column)));
            params.push(value.clone());
        }
    }

    (format!(" WHERE {}", terms.join(" AND ")), params)
}

/// `SELECT * FROM table [WHERE ...]`.
pub fn select(table: &str, predicate: &SqlMap) -> Statement {
    let (clause, params) = where_clause(predicate);
    Statement {
        sql: format!("SELECT * FROM {}{clause}", quote_ident(table)),
        params,
    }
}

/// `INSERT INTO table (cols...) VALUES (?...)`.
pub fn insert(table: &str, values: &SqlMap) -> Statement {
    let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params: values.values().cloned().collect(),
    }
}

/// Multi-row `INSERT INTO table (cols...) VALUES (?...), (?...), ...`.
///
/// The caller guarantees every row has exactly `columns.len()` values; the
/// store validates arity before building.
pub fn insert_bulk(table: &str, columns: &[String], rows: &[Vec<SqlValue>]) -> Statement {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let row_placeholders = format!(
        "({})",
        columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
    );
    let all_placeholders: Vec<&str> = rows.iter().map(|_| row_placeholders.as_str()).collect();
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(table),
            quoted.join(", "),
            all_placeholders.join(", ")
        ),
        params: rows.iter().flat_map(|row| row.iter().cloned()).collect(),
    }
}

/// `UPDATE table SET col = ?, ... [WHERE ...]`.
pub fn update(table: &str, values: &SqlMap, predicate: &SqlMap) -> Statement {
    let assignments: Vec<String> = values
        .keys()
        .map(|column| format!("{} = ?", quote_ident(column)))
        .collect();
    let mut params: Vec<SqlValue> = values.values().cloned().collect();

    let (clause, where_params) = where_clause(predicate);
    params.extend(where_params);

    Statement {
        sql: format!(
            "UPDATE {} SET {}{clause}",
            quote_ident(table),
            assignments.join(", ")
        ),
        params,
    }
}

/// `DELETE FROM table [WHERE ...]`.
pub fn delete(table: &str, predicate: &SqlMap) -> Statement {
    let (clause, params) = where_clause(predicate);
    Statement {
        sql: format!("DELETE FROM {}{clause}", quote_ident(table)),
        params,
    }
}

/// Remove every row of a table.
///
/// `SQLite` has no `TRUNCATE` statement; an unqualified `DELETE` is the
/// native equivalent (and hits the truncate optimization when no triggers
/// are attached).
pub fn truncate(table: &str) -> Statement {
    Statement::bare(format!("DELETE FROM {}", quote_ident(table)))
}
