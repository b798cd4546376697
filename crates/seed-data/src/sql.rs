//! Renders seed records as a single SQL `INSERT` statement.
//!
//! Used when the store offers raw SQL execution, so a whole batch lands in
//! one statement and comes back through `RETURNING *`.

use serde_json::Value;
use tutoring::Record;

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Renders a JSON value as a SQL literal.
///
/// Flat arrays of scalars become Postgres array literals (`'{"a","b"}'`)
/// so they coerce into `text[]` columns; objects and nested arrays are sent
/// as `jsonb`.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(items) if items.iter().all(is_scalar) => {
            let elements = items.iter().map(array_element).collect::<Vec<_>>().join(",");
            quote_literal(&format!("{{{elements}}}"))
        }
        Value::Array(_) | Value::Object(_) => format!("{}::jsonb", quote_literal(&value.to_string())),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn array_element(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Renders `INSERT INTO table (...) VALUES (...), ... RETURNING *`.
///
/// Columns are the union of all record fields in first-seen order; a record
/// lacking a column gets `DEFAULT`.
pub fn render_insert(table: &str, records: &[Record]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for field in record.fields() {
            if !columns.contains(&field) {
                columns.push(field);
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            let values = columns
                .iter()
                .map(|column| record.get(column).map_or_else(|| "DEFAULT".to_string(), literal))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({values})")
        })
        .collect::<Vec<_>>()
        .join(",\n  ");

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({})\nVALUES\n  {}\nRETURNING *",
        quote_ident(table),
        column_list,
        rows
    )
}
