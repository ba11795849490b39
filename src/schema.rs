//! Schema discovery through the engine's catalog and pragmas

use crate::{
    logging::{log_debug, log_warn},
    types, Error, Result,
};
use indexmap::IndexMap;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Internal table tracking AUTOINCREMENT counters; never shown
const SEQUENCE_TABLE: &str = "sqlite_sequence";

/// `pragma_table_xinfo` marks virtual-table hidden columns with 1; generated
/// columns (2 and 3) are real columns and stay visible
const HIDDEN_COLUMN: i64 = 1;

/// One column of a table, as reported by `pragma_table_xinfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Contiguous from 0 in engine-reported order
    pub ordinal_position: usize,
    pub declared_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    /// Set when the column is a source column of any foreign key constraint
    pub is_foreign_key: bool,
}

impl ColumnDescriptor {
    pub fn is_blob(&self) -> bool {
        types::is_blob(&self.declared_type)
    }
}

/// An index and the table it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    pub table_name: String,
}

/// Table name to ordered columns, in catalog order
pub type TableSchema = IndexMap<String, Vec<ColumnDescriptor>>;

/// Everything the introspector derives from one handle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub tables: TableSchema,
    pub indexes: Vec<IndexDescriptor>,
    /// First table in catalog order, if any
    pub default_table: Option<String>,
}

impl Schema {
    pub fn columns(&self, table: &str) -> Option<&[ColumnDescriptor]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.indexes.is_empty()
    }
}

struct CatalogEntry {
    kind: String,
    name: String,
    table_name: String,
}

/// Derive the full schema of the `main` database
pub fn introspect(conn: &Connection) -> Result<Schema> {
    let entries = read_catalog(conn)?;
    if entries.is_empty() {
        log_debug("Catalog is empty, database has no tables");
        return Ok(Schema::default());
    }

    let mut schema = Schema::default();
    for entry in entries {
        match entry.kind.as_str() {
            "table" => {
                let columns = table_columns(conn, &entry.name)?;
                if schema.default_table.is_none() {
                    schema.default_table = Some(entry.name.clone());
                }
                schema.tables.insert(entry.name, columns);
            }
            "index" => schema.indexes.push(IndexDescriptor {
                name: entry.name,
                table_name: entry.table_name,
            }),
            other => log_warn(&format!("Skipping catalog entry '{}' of type {}", entry.name, other)),
        }
    }

    log_debug(&format!(
        "Introspected {} tables and {} indexes",
        schema.tables.len(),
        schema.indexes.len()
    ));
    Ok(schema)
}

fn read_catalog(conn: &Connection) -> Result<Vec<CatalogEntry>> {
    let sql = "SELECT type, name, tbl_name FROM sqlite_master \
               WHERE type IN ('table', 'index') AND name != ?1";
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::SchemaError(format!("Failed to read catalog: {}", e)))?;
    let rows = stmt
        .query_map([SEQUENCE_TABLE], |row| {
            Ok(CatalogEntry {
                kind: row.get(0)?,
                name: row.get(1)?,
                table_name: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::SchemaError(format!("Failed to read catalog: {}", e)))?;
    Ok(rows)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let foreign_keys = foreign_key_sources(conn, table)?;

    let mut stmt = conn
        .prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_xinfo(?1) \
             WHERE hidden != ?2",
        )
        .map_err(|e| Error::SchemaError(format!("Failed to read columns of '{}': {}", table, e)))?;
    let mut columns = stmt
        .query_map(rusqlite::params![table, HIDDEN_COLUMN], |row| {
            let name: String = row.get(1)?;
            let not_null: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnDescriptor {
                is_foreign_key: foreign_keys.contains(&name),
                ordinal_position: row.get::<_, i64>(0)? as usize,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                nullable: not_null == 0,
                default_value: row.get(4)?,
                is_primary_key: pk > 0,
                name,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::SchemaError(format!("Failed to read columns of '{}': {}", table, e)))?;

    columns.sort_by_key(|c| c.ordinal_position);
    Ok(columns)
}

fn foreign_key_sources(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT \"from\" FROM pragma_foreign_key_list(?1)")
        .map_err(|e| Error::SchemaError(format!("Failed to read foreign keys of '{}': {}", table, e)))?;
    let sources = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::SchemaError(format!("Failed to read foreign keys of '{}': {}", table, e)))?;
    Ok(sources)
}
