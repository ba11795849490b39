//! SQLite WASM Viewer - the engine behind a browser SQLite viewer
//!
//! This library owns an in-memory SQLite database and exposes what a viewer
//! UI needs: schema discovery, filtered, sorted and paginated table reads,
//! ad-hoc SQL, row edits, CSV export and a byte-exact database download.
//!
//! A [`SessionHost`] owns the [`Session`] and answers tagged requests one at
//! a time. A [`Client`] keeps the view state and talks to a host running on
//! its own thread.
//!
//! # Example
//!
//! ```no_run
//! use sqlite_wasm_viewer::{Config, Error, Filters, Session, Sorters};
//!
//! fn main() -> Result<(), Error> {
//!     let mut session = Session::open_path("example.db")?;
//!
//!     // List all tables
//!     for (table, columns) in session.table_schema() {
//!         println!("Table: {} ({} columns)", table, columns.len());
//!     }
//!
//!     // Read the first page of the default table
//!     if let Some(table) = session.default_table().map(str::to_string) {
//!         let limit = Config::default().rows_per_page;
//!         let page = session.get_table_data(&table, limit, 0, &Filters::new(), &Sorters::new())?;
//!         println!("{} rows in total", page.total_rows);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod csv;
pub mod demo;
pub mod error;
pub mod format;
pub mod host;
pub mod logging;
pub mod pagination;
pub mod protocol;
pub mod query;
pub mod schema;
pub mod session;
pub mod statement;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use session::{ExecOutcome, Session, TablePage};
pub use value::{CellValue, ResultSet};
pub use logging::{LogLevel, init_logger, init_default_logger, set_log_level, log_error, log_warn, log_info, log_debug, log_trace};
pub use query::{BuiltQuery, Filters, SelectQuery, SortDirection, Sorters};

// Re-export commonly used types
pub use config::Config;
pub use format::{FileHeader, SourceKind};
pub use schema::{ColumnDescriptor, IndexDescriptor, Schema, TableSchema};
pub use pagination::PaginationCursor;

// Protocol and the two sides of the boundary
pub use protocol::{Request, RequestEnvelope, Response, ResponseEnvelope};
pub use host::{HostHandle, SessionHost};
pub use client::{Client, ViewState};
