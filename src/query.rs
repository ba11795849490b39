//! SQL assembly for paginated, filtered and sorted table reads
//!
//! Identifiers are always double-quoted and filter text is always bound as a
//! parameter, so neither a column name nor a search string can change the
//! shape of the statement.

use crate::{logging::log_trace, schema::ColumnDescriptor, value::CellValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Escape character used in generated LIKE patterns
const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Column name to substring filter. Empty values mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(IndexMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one column into the map, leaving the other columns alone
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Entries that actually restrict the result
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }

    pub fn is_active(&self) -> bool {
        self.active().next().is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Filters(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Column name to direction; insertion order is ORDER BY order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sorters(IndexMap<String, SortDirection>);

impl Sorters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a direction; an existing column keeps its position
    pub fn set(&mut self, column: impl Into<String>, direction: SortDirection) {
        self.0.insert(column.into(), direction);
    }

    pub fn remove(&mut self, column: &str) -> Option<SortDirection> {
        self.0.shift_remove(column)
    }

    pub fn get(&self, column: &str) -> Option<SortDirection> {
        self.0.get(column).copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(column, direction)| (column.as_str(), *direction))
    }
}

impl<K: Into<String>> FromIterator<(K, SortDirection)> for Sorters {
    fn from_iter<I: IntoIterator<Item = (K, SortDirection)>>(iter: I) -> Self {
        Sorters(iter.into_iter().map(|(k, d)| (k.into(), d)).collect())
    }
}

/// A statement plus the values bound to its `?` placeholders, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<CellValue>,
}

/// Quote an identifier for SQLite, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE wildcards so the value matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Build the WHERE fragment (without the keyword) for the active filters.
///
/// Each filter is a case-insensitive substring match. Returns an empty
/// fragment and no parameters when nothing is active.
pub fn build_where_clause(filters: &Filters) -> BuiltQuery {
    let mut conditions = Vec::new();
    let mut params = Vec::new();
    for (column, value) in filters.active() {
        conditions.push(format!(
            "lower(CAST({} AS TEXT)) LIKE lower(?) ESCAPE '{}'",
            quote_identifier(column),
            LIKE_ESCAPE
        ));
        params.push(CellValue::Text(format!("%{}%", escape_like(value))));
    }
    BuiltQuery {
        sql: conditions.join(" AND "),
        params,
    }
}

/// Build the ORDER BY fragment (without the keyword)
pub fn build_order_by_clause(sorters: &Sorters) -> String {
    sorters
        .iter()
        .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for the browse SELECT and its matching COUNT
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub table: String,
    pub filters: Filters,
    pub sorters: Sorters,
    pub limit: Option<u64>,
    pub offset: u64,
    /// Explicit projection; `None` selects `*`
    projection: Option<Vec<String>>,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Filters::default(),
            sorters: Sorters::default(),
            limit: None,
            offset: 0,
            projection: None,
        }
    }

    pub fn with_filters(mut self, filters: &Filters) -> Self {
        self.filters = filters.clone();
        self
    }

    pub fn with_sorters(mut self, sorters: &Sorters) -> Self {
        self.sorters = sorters.clone();
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Render BLOB columns as hex text, keeping their names.
    /// Has no effect when the table has no BLOB column.
    pub fn with_hex_blobs(mut self, columns: &[ColumnDescriptor]) -> Self {
        if columns.iter().any(ColumnDescriptor::is_blob) {
            let projection = columns
                .iter()
                .map(|column| {
                    let quoted = quote_identifier(&column.name);
                    if column.is_blob() {
                        // hex(NULL) is '', keep NULL distinguishable
                        format!("CASE WHEN {quoted} IS NULL THEN NULL ELSE hex({quoted}) END AS {quoted}")
                    } else {
                        quoted
                    }
                })
                .collect();
            self.projection = Some(projection);
        }
        self
    }

    fn from_where(&self) -> BuiltQuery {
        let mut sql = format!("FROM {}", quote_identifier(&self.table));
        let clause = build_where_clause(&self.filters);
        if !clause.sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
        }
        BuiltQuery {
            sql,
            params: clause.params,
        }
    }

    /// `SELECT ... FROM t [WHERE ...] [ORDER BY ...] [LIMIT n OFFSET m]`
    pub fn build(&self) -> BuiltQuery {
        let body = self.from_where();
        let columns = self
            .projection
            .as_ref()
            .map_or_else(|| "*".to_string(), |p| p.join(", "));
        let mut sql = format!("SELECT {} {}", columns, body.sql);

        let order_by = build_order_by_clause(&self.sorters);
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, self.offset));
        } else if self.offset > 0 {
            sql.push_str(&format!(" LIMIT -1 OFFSET {}", self.offset));
        }

        log_trace(&format!("Built select: {}", sql));
        BuiltQuery {
            sql,
            params: body.params,
        }
    }

    /// `SELECT COUNT(*) FROM t [WHERE ...]`; ignores sort and paging
    pub fn count(&self) -> BuiltQuery {
        let body = self.from_where();
        BuiltQuery {
            sql: format!("SELECT COUNT(*) {}", body.sql),
            params: body.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, declared_type: &str, position: usize) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            ordinal_position: position,
            declared_type: declared_type.into(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
            is_foreign_key: false,
        }
    }

    #[test]
    fn test_where_skips_empty_filters() {
        let filters: Filters = [("name", ""), ("email", "")].into_iter().collect();
        let clause = build_where_clause(&filters);
        assert!(clause.sql.is_empty());
        assert!(clause.params.is_empty());
        assert!(!filters.is_active());
    }

    #[test]
    fn test_where_single_filter() {
        let filters: Filters = [("name", "ab"), ("email", "")].into_iter().collect();
        let clause = build_where_clause(&filters);
        assert_eq!(
            clause.sql,
            "lower(CAST(\"name\" AS TEXT)) LIKE lower(?) ESCAPE '\\'"
        );
        assert_eq!(clause.params, vec![CellValue::Text("%ab%".into())]);
    }

    #[test]
    fn test_where_joins_with_and() {
        let filters: Filters = [("a", "1"), ("b", "2")].into_iter().collect();
        let clause = build_where_clause(&filters);
        assert_eq!(clause.sql.matches(" AND ").count(), 1);
        assert_eq!(clause.params.len(), 2);
    }

    #[test]
    fn test_where_escapes_wildcards() {
        let filters: Filters = [("code", "50%_off\\")].into_iter().collect();
        let clause = build_where_clause(&filters);
        assert_eq!(clause.params, vec![CellValue::Text("%50\\%\\_off\\\\%".into())]);
    }

    #[test]
    fn test_order_by_keeps_insertion_order() {
        let mut sorters = Sorters::new();
        sorters.set("b", SortDirection::Desc);
        sorters.set("a", SortDirection::Asc);
        assert_eq!(build_order_by_clause(&sorters), "\"b\" DESC, \"a\" ASC");

        sorters.set("b", SortDirection::Asc);
        assert_eq!(build_order_by_clause(&sorters), "\"b\" ASC, \"a\" ASC");

        sorters.remove("b");
        assert_eq!(build_order_by_clause(&sorters), "\"a\" ASC");
        assert_eq!(build_order_by_clause(&Sorters::new()), "");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_build_select() {
        let filters: Filters = [("name", "ali")].into_iter().collect();
        let sorters: Sorters = [("id", SortDirection::Desc)].into_iter().collect();
        let query = SelectQuery::new("Users")
            .with_filters(&filters)
            .with_sorters(&sorters)
            .with_limit(10)
            .with_offset(20)
            .build();
        assert_eq!(
            query.sql,
            "SELECT * FROM \"Users\" WHERE lower(CAST(\"name\" AS TEXT)) LIKE lower(?) ESCAPE '\\' \
             ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn test_build_select_unbounded() {
        let query = SelectQuery::new("t").build();
        assert_eq!(query.sql, "SELECT * FROM \"t\"");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_count_ignores_sort_and_paging() {
        let filters: Filters = [("name", "x")].into_iter().collect();
        let sorters: Sorters = [("id", SortDirection::Asc)].into_iter().collect();
        let query = SelectQuery::new("t")
            .with_filters(&filters)
            .with_sorters(&sorters)
            .with_limit(5)
            .count();
        assert!(query.sql.starts_with("SELECT COUNT(*) FROM \"t\" WHERE "));
        assert!(!query.sql.contains("ORDER BY"));
        assert!(!query.sql.contains("LIMIT"));
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn test_hex_projection() {
        let columns = vec![column("id", "INTEGER", 0), column("photo", "BLOB", 1)];
        let query = SelectQuery::new("p").with_hex_blobs(&columns).with_limit(1).build();
        assert_eq!(
            query.sql,
            "SELECT \"id\", CASE WHEN \"photo\" IS NULL THEN NULL ELSE hex(\"photo\") END AS \"photo\" \
             FROM \"p\" LIMIT 1 OFFSET 0"
        );

        let plain = vec![column("id", "INTEGER", 0)];
        let query = SelectQuery::new("p").with_hex_blobs(&plain).build();
        assert_eq!(query.sql, "SELECT * FROM \"p\"");
    }

    #[test]
    fn test_filters_serde_round_trip() {
        let filters: Filters = [("name", "al")].into_iter().collect();
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, r#"{"name":"al"}"#);
        let sorters: Sorters = serde_json::from_str(r#"{"id":"desc"}"#).unwrap();
        assert_eq!(sorters.get("id"), Some(SortDirection::Desc));
    }
}
