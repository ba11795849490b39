//! Messages exchanged between the client facade and the session host
//!
//! Every message is `{"seq": n, "action": "...", "payload": {...}}`. The host
//! echoes the request's `seq` on its response so the client can tell which
//! request a response answers.

use crate::{
    query::{Filters, Sorters},
    schema::{IndexDescriptor, Schema, TableSchema},
    value::{CellValue, ResultSet},
    Error,
};
use serde::{Deserialize, Serialize};

/// The view a data request is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub current_table: String,
    pub limit: u64,
    pub offset: u64,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sorters: Sorters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// The whole table
    Table,
    /// The current filtered, sorted page
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub table: String,
    pub offset: u64,
    pub limit: u64,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sorters: Sorters,
    pub export_type: ExportType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Request {
    Init,
    OpenFile {
        #[serde(with = "serde_bytes")]
        file: Vec<u8>,
    },
    GetTableData(TableView),
    Refresh(TableView),
    Exec {
        query: String,
        #[serde(flatten)]
        view: TableView,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        table: String,
        columns: Vec<String>,
        values: Vec<CellValue>,
        where_values: Vec<CellValue>,
    },
    Delete {
        table: String,
        columns: Vec<String>,
        values: Vec<CellValue>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<CellValue>,
    },
    Download,
    Export(ExportRequest),
}

impl Request {
    /// The wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            Request::Init => "init",
            Request::OpenFile { .. } => "openFile",
            Request::GetTableData(_) => "getTableData",
            Request::Refresh(_) => "refresh",
            Request::Exec { .. } => "exec",
            Request::Update { .. } => "update",
            Request::Delete { .. } => "delete",
            Request::Insert { .. } => "insert",
            Request::Download => "download",
            Request::Export(_) => "export",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPayload {
    pub table_schema: TableSchema,
    pub index_schema: Vec<IndexDescriptor>,
    pub current_table: Option<String>,
}

impl From<&Schema> for SchemaPayload {
    fn from(schema: &Schema) -> Self {
        Self {
            table_schema: schema.tables.clone(),
            index_schema: schema.indexes.clone(),
            current_table: schema.default_table.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub is_custom_query_error: bool,
    /// Present when earlier statements of a failed `exec` changed the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaPayload>,
}

impl ErrorPayload {
    pub fn with_schema(mut self, schema: SchemaPayload) -> Self {
        self.schema = Some(schema);
        self
    }
}

impl From<&Error> for ErrorPayload {
    fn from(error: &Error) -> Self {
        Self {
            message: error.to_string(),
            is_custom_query_error: error.is_custom_query_error(),
            schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Response {
    InitComplete(SchemaPayload),
    #[serde(rename_all = "camelCase")]
    QueryComplete {
        results: Vec<ResultSet>,
        max_size: u64,
    },
    CustomQueryComplete {
        results: Vec<ResultSet>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateInstance {
        table_schema: TableSchema,
        index_schema: Vec<IndexDescriptor>,
    },
    UpdateComplete {
        #[serde(rename = "type")]
        kind: MutationKind,
    },
    InsertComplete,
    DownloadComplete {
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    ExportComplete {
        results: String,
    },
    QueryError {
        error: ErrorPayload,
    },
}

impl Response {
    pub fn error(error: &Error) -> Self {
        Response::QueryError {
            error: ErrorPayload::from(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub seq: u64,
    #[serde(flatten)]
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub seq: u64,
    #[serde(flatten)]
    pub response: Response,
}
