//! CSV rendering for exports
//!
//! Every field is double-quoted, embedded quotes are doubled and rows are
//! joined with `\n`, so commas, quotes and newlines inside a value never
//! change the column count.

use crate::value::{CellValue, ResultSet};

fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn render_row<I>(fields: I) -> String
where
    I: IntoIterator<Item = String>,
{
    fields
        .into_iter()
        .map(|field| quote_field(&field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header line followed by one line per row
pub fn to_csv(result: &ResultSet) -> String {
    let mut lines = Vec::with_capacity(result.rows.len() + 1);
    lines.push(render_row(result.columns.iter().cloned()));
    for row in &result.rows {
        lines.push(render_row(row.iter().map(CellValue::to_csv_field)));
    }
    lines.join("\n")
}
