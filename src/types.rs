//! Classification of declared column types
//!
//! Matching is case-insensitive and substring based, following the affinity
//! rules SQLite itself applies to declared types. Anything unmatched is left
//! for the presentation layer to render generically.

fn declared(type_name: &str) -> String {
    type_name.trim().to_ascii_uppercase()
}

fn contains_any(type_name: &str, needles: &[&str]) -> bool {
    let upper = declared(type_name);
    needles.iter().any(|needle| upper.contains(needle))
}

pub fn is_date(type_name: &str) -> bool {
    contains_any(type_name, &["DATE", "TIMESTAMP"])
}

/// Only the bare `BLOB` declaration counts
pub fn is_blob(type_name: &str) -> bool {
    declared(type_name) == "BLOB"
}

pub fn is_text(type_name: &str) -> bool {
    contains_any(type_name, &["CHAR", "TEXT", "CLOB", "VARCHAR"])
}

pub fn is_integer(type_name: &str) -> bool {
    contains_any(type_name, &["INT"])
}

pub fn is_real(type_name: &str) -> bool {
    contains_any(type_name, &["REAL", "FLOAT", "DOUBLE", "DECIMAL"])
}

pub fn is_numeric(type_name: &str) -> bool {
    contains_any(type_name, &["NUMERIC"])
}

pub fn is_number(type_name: &str) -> bool {
    is_integer(type_name) || is_real(type_name) || is_numeric(type_name)
}

pub fn is_boolean(type_name: &str) -> bool {
    contains_any(type_name, &["BOOL"])
}
