//! Client-side facade over a session host
//!
//! The client keeps the UI-visible state and turns each user intent into one
//! request. Requests never block: responses are applied later through
//! [`Client::poll`] or [`Client::wait_idle`].
//!
//! Every request is tagged with a fresh `seq`. A response is applied only if
//! its request is still the latest of its kind, so an older page fetch that
//! arrives late cannot overwrite a newer one.

use crate::{
    config::Config,
    host::HostHandle,
    logging::{log_debug, log_info, log_warn},
    pagination::PaginationCursor,
    protocol::{ExportRequest, ExportType, Request, RequestEnvelope, Response, ResponseEnvelope, TableView},
    query::{Filters, SortDirection, Sorters},
    schema::{IndexDescriptor, TableSchema},
    value::{CellValue, ResultSet},
    Error, Result,
};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The kind of work a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// `init` and `openFile`
    Schema,
    /// Page fetches and refreshes
    Data,
    /// User-typed SQL
    Query,
    /// Row edits; every response is applied
    Mutation,
    Export,
    Download,
}

/// What the UI renders
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub schema: TableSchema,
    pub indexes: Vec<IndexDescriptor>,
    pub current_table: Option<String>,
    pub filters: Filters,
    pub sorters: Sorters,
    pub cursor: PaginationCursor,
    pub total_rows: u64,
    /// Last known columns; kept when a fetch returns no rows
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub custom_results: Vec<ResultSet>,
    /// Global error (load, mutation, export, download failures)
    pub error: Option<String>,
    /// Inline error for user-typed SQL
    pub custom_query_error: Option<String>,
    pub loading_schema: bool,
    pub loading_data: bool,
    pub running_query: bool,
    pub last_export: Option<String>,
    pub last_download: Option<Vec<u8>>,
}

impl ViewState {
    fn new(rows_per_page: u64) -> Self {
        Self {
            schema: TableSchema::new(),
            indexes: Vec::new(),
            current_table: None,
            filters: Filters::new(),
            sorters: Sorters::new(),
            cursor: PaginationCursor::new(rows_per_page),
            total_rows: 0,
            columns: Vec::new(),
            rows: Vec::new(),
            custom_results: Vec::new(),
            error: None,
            custom_query_error: None,
            loading_schema: false,
            loading_data: false,
            running_query: false,
            last_export: None,
            last_download: None,
        }
    }

    fn schema_columns(&self, table: &str) -> Vec<String> {
        self.schema
            .get(table)
            .map(|columns| columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Point the view at `table` with no filters, sorting or offset
    fn reset_view(&mut self, table: Option<String>) {
        self.columns = table
            .as_deref()
            .map(|t| self.schema_columns(t))
            .unwrap_or_default();
        self.current_table = table;
        self.filters.clear();
        self.sorters.clear();
        self.cursor.first();
        self.rows.clear();
        self.total_rows = 0;
    }
}

pub struct Client {
    host: HostHandle,
    config: Config,
    state: ViewState,
    next_seq: u64,
    /// In-flight requests by `seq`
    pending: HashMap<u64, Intent>,
    /// Newest `seq` sent per intent
    latest: HashMap<Intent, u64>,
    /// When a debounced fetch is due
    fetch_due: Option<Instant>,
}

impl Client {
    /// Start a session host on its own thread and attach to it
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let host = HostHandle::spawn(config.clone())?;
        Ok(Self {
            host,
            state: ViewState::new(config.rows_per_page),
            config,
            next_seq: 0,
            pending: HashMap::new(),
            latest: HashMap::new(),
            fetch_due: None,
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// No request in flight and no fetch waiting on the debounce timer
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.fetch_due.is_none()
    }

    pub fn init(&mut self) -> Result<u64> {
        self.state.loading_schema = true;
        self.send(Intent::Schema, Request::Init)
    }

    pub fn open_file(&mut self, bytes: Vec<u8>) -> Result<u64> {
        self.state.loading_schema = true;
        self.send(Intent::Schema, Request::OpenFile { file: bytes })
    }

    /// Switch tables; filters, sorting and offset never carry over
    pub fn select_table(&mut self, table: &str) -> Result<Option<u64>> {
        if !self.state.schema.contains_key(table) {
            return Err(Error::TableNotFound(table.to_string()));
        }
        self.state.reset_view(Some(table.to_string()));
        self.fetch()
    }

    /// Merge one column's filter and schedule a debounced fetch
    pub fn set_filter(&mut self, column: &str, value: &str) {
        self.set_filter_at(column, value, Instant::now());
    }

    pub fn set_filter_at(&mut self, column: &str, value: &str, now: Instant) {
        self.state.filters.set(column, value);
        self.state.cursor.first();
        self.fetch_due = Some(now + self.config.debounce());
    }

    /// Send the debounced fetch if its quiet period has passed
    pub fn tick(&mut self) -> Result<Option<u64>> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Result<Option<u64>> {
        match self.fetch_due {
            Some(due) if due <= now => self.fetch(),
            _ => Ok(None),
        }
    }

    /// Send the debounced fetch now, if one is waiting
    pub fn flush(&mut self) -> Result<Option<u64>> {
        if self.fetch_due.is_some() {
            self.fetch()
        } else {
            Ok(None)
        }
    }

    /// Cycle a column through unsorted, ascending and descending
    pub fn toggle_sort(&mut self, column: &str) -> Result<Option<u64>> {
        match self.state.sorters.get(column) {
            None => self.state.sorters.set(column, SortDirection::Asc),
            Some(SortDirection::Asc) => self.state.sorters.set(column, SortDirection::Desc),
            Some(SortDirection::Desc) => {
                self.state.sorters.remove(column);
            }
        }
        self.fetch()
    }

    pub fn next_page(&mut self) -> Result<Option<u64>> {
        self.state.cursor.next(self.state.total_rows);
        self.fetch()
    }

    pub fn prev_page(&mut self) -> Result<Option<u64>> {
        self.state.cursor.prev();
        self.fetch()
    }

    pub fn first_page(&mut self) -> Result<Option<u64>> {
        self.state.cursor.first();
        self.fetch()
    }

    pub fn last_page(&mut self) -> Result<Option<u64>> {
        self.state.cursor.last(self.state.total_rows);
        self.fetch()
    }

    pub fn set_rows_per_page(&mut self, limit: u64) -> Result<Option<u64>> {
        self.state.cursor.set_limit(limit);
        self.fetch()
    }

    /// Re-read the current page without changing the view
    pub fn refresh(&mut self) -> Result<Option<u64>> {
        match self.view() {
            Some(view) => {
                self.fetch_due = None;
                self.state.loading_data = true;
                self.send(Intent::Data, Request::Refresh(view)).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn run_query(&mut self, sql: &str) -> Result<u64> {
        let view = self.view().unwrap_or_else(|| self.view_of(String::new()));
        self.state.custom_query_error = None;
        self.state.running_query = true;
        self.send(
            Intent::Query,
            Request::Exec {
                query: sql.to_string(),
                view,
            },
        )
    }

    pub fn update_row(&mut self, columns: Vec<String>, values: Vec<CellValue>, where_values: Vec<CellValue>) -> Result<u64> {
        let table = self.require_table()?;
        self.send(
            Intent::Mutation,
            Request::Update {
                table,
                columns,
                values,
                where_values,
            },
        )
    }

    pub fn delete_row(&mut self, columns: Vec<String>, values: Vec<CellValue>) -> Result<u64> {
        let table = self.require_table()?;
        self.send(Intent::Mutation, Request::Delete { table, columns, values })
    }

    pub fn insert_row(&mut self, columns: Vec<String>, values: Vec<CellValue>) -> Result<u64> {
        let table = self.require_table()?;
        self.send(Intent::Mutation, Request::Insert { table, columns, values })
    }

    pub fn export(&mut self, export_type: ExportType) -> Result<u64> {
        let table = self.require_table()?;
        let request = ExportRequest {
            table,
            offset: self.state.cursor.offset,
            limit: self.state.cursor.limit,
            filters: self.state.filters.clone(),
            sorters: self.state.sorters.clone(),
            export_type,
        };
        self.send(Intent::Export, Request::Export(request))
    }

    pub fn download(&mut self) -> Result<u64> {
        self.send(Intent::Download, Request::Download)
    }

    /// Apply every response already waiting; returns how many were applied
    pub fn poll(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            match self.host.responses().try_recv() {
                Ok(envelope) => {
                    if self.apply(envelope)? {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) => return Ok(applied),
                Err(TryRecvError::Disconnected) => return Err(Error::HostClosed),
            }
        }
    }

    /// Flush any debounced fetch and block until nothing is in flight
    pub fn wait_idle(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.flush()?;
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.host.responses().recv_timeout(remaining) {
                Ok(envelope) => {
                    self.apply(envelope)?;
                }
                Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(Error::HostClosed),
            }
        }
        Ok(())
    }

    /// Apply one response. Returns false when it was stale or unknown.
    pub fn apply(&mut self, envelope: ResponseEnvelope) -> Result<bool> {
        let ResponseEnvelope { seq, response } = envelope;
        let Some(intent) = self.pending.remove(&seq) else {
            log_warn(&format!("Dropping response to unknown request {}", seq));
            return Ok(false);
        };
        if intent != Intent::Mutation && self.latest.get(&intent).is_some_and(|&latest| latest > seq) {
            log_debug(&format!("Dropping stale {:?} response {}", intent, seq));
            return Ok(false);
        }
        self.apply_response(intent, response)?;
        Ok(true)
    }

    fn apply_response(&mut self, intent: Intent, response: Response) -> Result<()> {
        match response {
            Response::InitComplete(payload) => {
                log_info(&format!("Loaded schema with {} tables", payload.table_schema.len()));
                self.state.loading_schema = false;
                self.state.error = None;
                self.state.custom_results.clear();
                self.state.schema = payload.table_schema;
                self.state.indexes = payload.index_schema;
                self.state.reset_view(payload.current_table);
                self.fetch()?;
            }
            Response::QueryComplete { results, max_size } => {
                self.state.loading_data = false;
                if intent == Intent::Query {
                    self.state.running_query = false;
                }
                self.state.total_rows = max_size;
                match results.into_iter().next() {
                    Some(result) if !result.is_empty() => {
                        self.state.columns = result.columns;
                        self.state.rows = result.rows;
                    }
                    _ => self.state.rows.clear(),
                }
            }
            Response::CustomQueryComplete { results } => {
                self.state.running_query = false;
                self.state.custom_results = results;
            }
            Response::UpdateInstance {
                table_schema,
                index_schema,
            } => {
                self.state.running_query = false;
                self.apply_schema(table_schema, index_schema)?;
            }
            Response::UpdateComplete { .. } | Response::InsertComplete => {
                self.refresh()?;
            }
            Response::DownloadComplete { bytes } => {
                self.state.last_download = Some(bytes);
            }
            Response::ExportComplete { results } => {
                self.state.last_export = Some(results);
            }
            Response::QueryError { error } => {
                match intent {
                    Intent::Schema => self.state.loading_schema = false,
                    Intent::Data => self.state.loading_data = false,
                    Intent::Query => self.state.running_query = false,
                    _ => {}
                }
                if error.is_custom_query_error {
                    self.state.custom_query_error = Some(error.message);
                } else {
                    log_warn(&format!("{:?} request failed: {}", intent, error.message));
                    self.state.error = Some(error.message);
                }
                if let Some(schema) = error.schema {
                    self.apply_schema(schema.table_schema, schema.index_schema)?;
                }
            }
        }
        Ok(())
    }

    /// Take a new schema, keeping the current table when it still exists
    fn apply_schema(&mut self, table_schema: TableSchema, index_schema: Vec<IndexDescriptor>) -> Result<()> {
        self.state.schema = table_schema;
        self.state.indexes = index_schema;
        let still_there = self
            .state
            .current_table
            .as_ref()
            .is_some_and(|t| self.state.schema.contains_key(t));
        if !still_there {
            let first = self.state.schema.keys().next().cloned();
            self.state.reset_view(first);
        }
        self.fetch().map(|_| ())
    }

    fn send(&mut self, intent: Intent, request: Request) -> Result<u64> {
        self.next_seq += 1;
        let seq = self.next_seq;
        log_debug(&format!("Sending {} (seq {})", request.action(), seq));
        self.host.send(RequestEnvelope { seq, request })?;
        self.pending.insert(seq, intent);
        self.latest.insert(intent, seq);
        Ok(seq)
    }

    /// Request the current page; does nothing while no table is selected
    fn fetch(&mut self) -> Result<Option<u64>> {
        self.fetch_due = None;
        match self.view() {
            Some(view) => {
                self.state.loading_data = true;
                self.send(Intent::Data, Request::GetTableData(view)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn view(&self) -> Option<TableView> {
        self.state.current_table.clone().map(|table| self.view_of(table))
    }

    fn view_of(&self, table: String) -> TableView {
        TableView {
            current_table: table,
            limit: self.state.cursor.limit,
            offset: self.state.cursor.offset,
            filters: self.state.filters.clone(),
            sorters: self.state.sorters.clone(),
        }
    }

    fn require_table(&self) -> Result<String> {
        self.state.current_table.clone().ok_or(Error::NotInitialized)
    }
}
