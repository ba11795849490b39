//! The database session
//!
//! A [`Session`] owns one in-memory engine handle and the schema derived from
//! it. All browsing, ad-hoc execution, row edits and exports go through it.
//! It is not shareable across threads; the host serializes access to it.

use crate::{
    csv,
    demo,
    format::{FileHeader, SourceKind},
    logging::{log_debug, log_info, log_warn},
    query::{quote_identifier, BuiltQuery, Filters, SelectQuery, Sorters},
    schema::{self, IndexDescriptor, Schema, TableSchema},
    statement,
    value::{CellValue, ResultSet},
    Error, Result,
};
use rusqlite::{backup::Progress, params_from_iter, Connection, DatabaseName, Params, Statement};
use std::io::Write;
use std::path::Path;

/// What one ad-hoc statement produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutcome {
    /// One entry when the statement returns columns, none otherwise
    pub results: Vec<ResultSet>,
    /// The statement started with CREATE, DROP or ALTER
    pub schema_changed: bool,
}

/// One page of a table plus the row count of the whole filtered view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePage {
    /// Empty when no row matched
    pub results: Vec<ResultSet>,
    pub total_rows: u64,
}

/// Last COUNT result, reused while only the sort or page changes
#[derive(Debug, Clone)]
struct CachedCount {
    query: BuiltQuery,
    total: u64,
}

pub struct Session {
    conn: Connection,
    schema: Schema,
    hex_blobs: bool,
    count_cache: Option<CachedCount>,
}

impl Session {
    /// Start from an empty database, optionally seeded with the demo dataset
    pub fn create(seed_demo: bool) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        if seed_demo {
            conn.execute_batch(demo::SEED_SQL)?;
            log_debug("Seeded demo dataset");
        }
        Self::from_connection(conn)
    }

    /// Load a database image or a SQL script from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let conn = match SourceKind::detect(bytes)? {
            SourceKind::Database(header) => {
                log_info(&format!(
                    "Opening database image: {} pages of {} bytes",
                    header.database_size, header.page_size
                ));
                restore_image(conn, bytes)?
            }
            SourceKind::SqlScript(script) => {
                log_info(&format!("Running SQL script of {} bytes", script.len()));
                conn.execute_batch(&script)?;
                conn
            }
        };
        Self::from_connection(conn)
    }

    /// Memory-map a file from disk and open it
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        // SAFETY: the mapping is only read while `open` copies it into the engine
        let mapped = unsafe { memmap2::Mmap::map(&file)? };
        Self::open(&mapped)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let schema = schema::introspect(&conn)?;
        log_info(&format!(
            "Session ready with {} tables and {} indexes",
            schema.tables.len(),
            schema.indexes.len()
        ));
        Ok(Session {
            conn,
            schema,
            hex_blobs: true,
            count_cache: None,
        })
    }

    /// Toggle hex rendering of BLOB columns in browse reads and exports
    pub fn with_hex_blobs(mut self, enabled: bool) -> Self {
        self.hex_blobs = enabled;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn table_schema(&self) -> &TableSchema {
        &self.schema.tables
    }

    pub fn indexes(&self) -> &[IndexDescriptor] {
        &self.schema.indexes
    }

    pub fn default_table(&self) -> Option<&str> {
        self.schema.default_table.as_deref()
    }

    /// Re-derive the whole schema from the catalog
    pub fn refresh_schema(&mut self) -> Result<()> {
        self.schema = schema::introspect(&self.conn)?;
        self.count_cache = None;
        Ok(())
    }

    /// Run one user-authored statement.
    ///
    /// Engine failures come back as [`Error::CustomQuery`]. The text is not
    /// split; callers hand over one statement at a time.
    pub fn exec(&mut self, sql: &str) -> Result<ExecOutcome> {
        log_debug(&format!("Executing custom query: {}", sql));
        self.count_cache = None;

        let results = run_statement(&self.conn, sql).map_err(|e| Error::CustomQuery(e.to_string()))?;
        let schema_changed = statement::is_schema_changing(sql);
        if schema_changed {
            log_info("Schema-changing statement executed, re-deriving schema");
            self.refresh_schema()?;
        }
        Ok(ExecOutcome {
            results,
            schema_changed,
        })
    }

    /// Fetch one page of `table` plus the total number of matching rows
    pub fn get_table_data(
        &mut self,
        table: &str,
        limit: u64,
        offset: u64,
        filters: &Filters,
        sorters: &Sorters,
    ) -> Result<TablePage> {
        let select = self
            .select_for(table)?
            .with_filters(filters)
            .with_sorters(sorters)
            .with_limit(limit)
            .with_offset(offset);

        let result = self.run_query(&select.build())?;
        let total_rows = self.count_rows(&select)?;
        log_debug(&format!(
            "Fetched {} of {} rows from '{}' at offset {}",
            result.len(),
            total_rows,
            table,
            offset
        ));

        let results = if result.is_empty() { Vec::new() } else { vec![result] };
        Ok(TablePage { results, total_rows })
    }

    /// Overwrite every row whose columns all equal `where_values`
    pub fn update<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        values: &[CellValue],
        where_values: &[CellValue],
    ) -> Result<usize> {
        check_arity(table, columns.len(), values.len())?;
        check_arity(table, columns.len(), where_values.len())?;

        let assignments = columns
            .iter()
            .map(|c| format!("{} = ?", quote_identifier(c.as_ref())))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote_identifier(table),
            assignments,
            match_every_column(columns)
        );
        let params: Vec<CellValue> = self
            .bind_values(table, columns, values)
            .into_iter()
            .chain(self.bind_values(table, columns, where_values))
            .collect();
        self.execute_mutation(table, &sql, params)
    }

    /// Delete every row whose columns all equal `values`
    pub fn delete<S: AsRef<str>>(&mut self, table: &str, columns: &[S], values: &[CellValue]) -> Result<usize> {
        check_arity(table, columns.len(), values.len())?;

        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(table),
            match_every_column(columns)
        );
        let params = self.bind_values(table, columns, values);
        self.execute_mutation(table, &sql, params)
    }

    pub fn insert<S: AsRef<str>>(&mut self, table: &str, columns: &[S], values: &[CellValue]) -> Result<()> {
        check_arity(table, columns.len(), values.len())?;

        let names = columns
            .iter()
            .map(|c| quote_identifier(c.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            names,
            placeholders
        );
        let params = self.bind_values(table, columns, values);
        self.execute_mutation(table, &sql, params).map(|_| ())
    }

    /// Serialize the whole database to its on-disk format
    pub fn download(&self) -> Result<Vec<u8>> {
        let staged = tempfile::NamedTempFile::new()?;
        self.conn
            .backup(DatabaseName::Main, staged.path(), None::<fn(Progress)>)?;
        let bytes = std::fs::read(staged.path())?;
        log_debug(&format!("Serialized database image of {} bytes", bytes.len()));
        Ok(bytes)
    }

    /// Header of the image `download` would produce
    pub fn header(&self) -> Result<FileHeader> {
        FileHeader::parse(&self.download()?)
    }

    /// Whole table, unfiltered and unsorted, as CSV
    pub fn export_table_as_csv(&self, table: &str) -> Result<String> {
        let result = self.run_query(&self.select_for(table)?.build())?;
        Ok(csv::to_csv(&result))
    }

    /// The current filtered, sorted page as CSV
    pub fn export_current_data_as_csv(
        &self,
        table: &str,
        limit: u64,
        offset: u64,
        filters: &Filters,
        sorters: &Sorters,
    ) -> Result<String> {
        let query = self
            .select_for(table)?
            .with_filters(filters)
            .with_sorters(sorters)
            .with_limit(limit)
            .with_offset(offset)
            .build();
        let result = self.run_query(&query)?;
        Ok(csv::to_csv(&result))
    }

    fn select_for(&self, table: &str) -> Result<SelectQuery> {
        let columns = self
            .schema
            .columns(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        let select = SelectQuery::new(table);
        Ok(if self.hex_blobs {
            select.with_hex_blobs(columns)
        } else {
            select
        })
    }

    fn run_query(&self, query: &BuiltQuery) -> Result<ResultSet> {
        log_debug(&format!("Running: {}", query.sql));
        let mut stmt = self.conn.prepare(&query.sql)?;
        Ok(collect_rows(&mut stmt, params_from_iter(query.params.iter()))?)
    }

    fn count_rows(&mut self, select: &SelectQuery) -> Result<u64> {
        let query = select.count();
        if let Some(cached) = &self.count_cache {
            if cached.query == query {
                return Ok(cached.total);
            }
        }
        log_debug(&format!("Counting: {}", query.sql));
        let total: i64 = self
            .conn
            .query_row(&query.sql, params_from_iter(query.params.iter()), |row| row.get(0))?;
        let total = total.max(0) as u64;
        self.count_cache = Some(CachedCount { query, total });
        Ok(total)
    }

    /// Turn hex text coming back from the view into bytes for BLOB columns
    fn bind_values<S: AsRef<str>>(&self, table: &str, columns: &[S], values: &[CellValue]) -> Vec<CellValue> {
        let descriptors = self.schema.columns(table).unwrap_or_default();
        columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let is_blob = descriptors
                    .iter()
                    .any(|d| d.name == column.as_ref() && d.is_blob());
                match value.as_text() {
                    Some(text) if self.hex_blobs && is_blob => {
                        decode_hex(text).map_or_else(|| value.clone(), CellValue::Blob)
                    }
                    _ => value.clone(),
                }
            })
            .collect()
    }

    fn execute_mutation(&mut self, table: &str, sql: &str, params: Vec<CellValue>) -> Result<usize> {
        log_debug(&format!("Mutation on '{}': {}", table, sql));
        self.count_cache = None;
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(|e| {
                log_warn(&format!("Mutation on '{}' failed: {}", table, e));
                Error::mutation(table, e)
            })
    }
}

fn restore_image(mut conn: Connection, bytes: &[u8]) -> Result<Connection> {
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(bytes)?;
    staged.flush()?;
    conn.restore(DatabaseName::Main, staged.path(), None::<fn(Progress)>)
        .map_err(|e| Error::InvalidFormat(format!("Failed to load database image: {}", e)))?;
    Ok(conn)
}

fn run_statement(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<ResultSet>> {
    if sql.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        stmt.execute([])?;
        return Ok(Vec::new());
    }
    Ok(vec![collect_rows(&mut stmt, [])?])
}

fn collect_rows<P: Params>(stmt: &mut Statement<'_>, params: P) -> rusqlite::Result<ResultSet> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut result = ResultSet::new(columns);

    let mut rows = stmt.query(params)?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(CellValue::from(row.get_ref(i)?));
        }
        result.rows.push(values);
    }
    Ok(result)
}

/// `"a" IS ? AND "b" IS ?`; IS also matches NULL cells
fn match_every_column<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| format!("{} IS ?", quote_identifier(c.as_ref())))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn check_arity(table: &str, columns: usize, values: usize) -> Result<()> {
    if columns == 0 || columns != values {
        return Err(Error::mutation(
            table,
            rusqlite::Error::InvalidParameterCount(values, columns),
        ));
    }
    Ok(())
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}
