//! Cell values and result sets

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// A single cell as it crosses the session boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// NULL value
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Text value
    Text(String),
    /// BLOB value
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl CellValue {
    /// The text of a TEXT value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String coercion used by CSV export; NULL becomes the empty string
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Real(r) => r.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Blob(b) => b.iter().map(|byte| format!("{byte:02X}")).collect(),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(r) => CellValue::Real(r),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Real(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(value: Vec<u8>) -> Self {
        CellValue::Blob(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            CellValue::Null => ValueRef::Null,
            CellValue::Integer(i) => ValueRef::Integer(*i),
            CellValue::Real(r) => ValueRef::Real(*r),
            CellValue::Text(s) => ValueRef::Text(s.as_bytes()),
            CellValue::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl core::fmt::Display for CellValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Blob(b) => write!(f, "BLOB({} bytes)", b.len()),
        }
    }
}

/// Rows returned by one statement, positionally aligned to `columns`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    #[serde(rename = "values")]
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text() {
        assert_eq!(CellValue::Text("hello".into()).as_text(), Some("hello"));
        assert_eq!(CellValue::Integer(42).as_text(), None);
        assert_eq!(CellValue::Blob(vec![1, 2]).as_text(), None);
    }

    #[test]
    fn test_csv_field_coercion() {
        assert_eq!(CellValue::Null.to_csv_field(), "");
        assert_eq!(CellValue::Integer(-7).to_csv_field(), "-7");
        assert_eq!(CellValue::Real(1.5).to_csv_field(), "1.5");
        assert_eq!(CellValue::Text("a,b".into()).to_csv_field(), "a,b");
        assert_eq!(CellValue::Blob(vec![0x0a, 0xff]).to_csv_field(), "0AFF");
    }

    #[test]
    fn test_from_value_ref() {
        assert_eq!(CellValue::from(ValueRef::Null), CellValue::Null);
        assert_eq!(CellValue::from(ValueRef::Integer(3)), CellValue::Integer(3));
        assert_eq!(
            CellValue::from(ValueRef::Text(b"abc")),
            CellValue::Text("abc".into())
        );
        assert_eq!(
            CellValue::from(ValueRef::Blob(&[9, 8])),
            CellValue::Blob(vec![9, 8])
        );
    }

    #[test]
    fn test_from_option() {
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
        assert_eq!(CellValue::from(Some("x")), CellValue::Text("x".into()));
    }

    #[test]
    fn test_json_shape() {
        let row = vec![
            CellValue::Null,
            CellValue::Integer(1),
            CellValue::Real(2.5),
            CellValue::Text("Alice".into()),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,1,2.5,"Alice"]"#);

        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_result_set_serializes_values_key() {
        let mut set = ResultSet::new(vec!["id".into()]);
        set.rows.push(vec![CellValue::Integer(1)]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"columns":["id"],"values":[[1]]}"#);
        assert_eq!(set.column_index("id"), Some(0));
        assert_eq!(set.len(), 1);
    }
}
