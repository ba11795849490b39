//! Error types for the viewer session

use thiserror::Error;

/// Result type alias for operations that can fail with our Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while loading, browsing or editing a database
#[derive(Debug, Error)]
pub enum Error {
    /// Catalog or pragma introspection failed
    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error")]
    Utf8Error(#[from] core::str::Utf8Error),

    #[error("Invalid SQLite file format: {0}")]
    InvalidFormat(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// An insert, update or delete was rejected by the engine
    #[error("Failed to modify table '{table}': {source}")]
    Mutation {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// User-authored SQL failed; routed inline rather than as a global notice
    #[error("{0}")]
    CustomQuery(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Session is not initialized")]
    NotInitialized,

    #[error("Session host is closed")]
    HostClosed,

    #[error("Timed out after {0:?} waiting for the session host")]
    Timeout(std::time::Duration),
}

impl Error {
    /// Wrap an engine error with the name of the table being modified
    pub fn mutation(table: &str, source: rusqlite::Error) -> Self {
        Error::Mutation {
            table: table.to_string(),
            source,
        }
    }

    /// True when the failure came from user-typed SQL
    pub fn is_custom_query_error(&self) -> bool {
        matches!(self, Error::CustomQuery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let format_error = Error::InvalidFormat("Test format error".to_string());
        let table_error = Error::TableNotFound("test_table".to_string());
        let custom_error = Error::CustomQuery("near \"SELEC\": syntax error".to_string());

        assert_eq!(
            format_error.to_string(),
            "Invalid SQLite file format: Test format error"
        );
        assert_eq!(table_error.to_string(), "Table not found: test_table");
        assert_eq!(custom_error.to_string(), "near \"SELEC\": syntax error");
        assert_eq!(Error::NotInitialized.to_string(), "Session is not initialized");
    }

    #[test]
    fn test_mutation_error_names_table() {
        let error = Error::mutation("users", rusqlite::Error::InvalidQuery);
        assert!(matches!(error, Error::Mutation { ref table, .. } if table == "users"));
        assert!(error.to_string().starts_with("Failed to modify table 'users'"));
        assert!(!error.is_custom_query_error());
    }

    #[test]
    fn test_custom_query_flag() {
        assert!(Error::CustomQuery("boom".into()).is_custom_query_error());
        assert!(!Error::SchemaError("boom".into()).is_custom_query_error());
        assert!(!Error::HostClosed.is_custom_query_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let viewer_error: Error = io_error.into();

        assert!(matches!(viewer_error, Error::Io(_)));
    }

    #[test]
    fn test_result_type() {
        let success: Result<()> = Ok(());
        let failure: Result<()> = Err(Error::InvalidFormat("Test".to_string()));

        assert!(success.is_ok());
        assert!(failure.is_err());
    }
}
