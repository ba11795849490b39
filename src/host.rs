//! The session host: the only owner of a [`Session`]
//!
//! Requests are handled strictly one at a time, in arrival order. Every
//! request gets exactly one response carrying the same `seq`; failures become
//! `queryError` responses and never escape the host.

use crate::{
    config::Config,
    logging::{log_debug, log_error, log_info, log_warn},
    protocol::{
        ErrorPayload, ExportRequest, ExportType, MutationKind, Request, RequestEnvelope, Response, ResponseEnvelope,
        SchemaPayload, TableView,
    },
    session::Session,
    statement, Error, Result,
};
use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;

/// `seq` used when a malformed request's own `seq` cannot be recovered
pub const UNKNOWN_SEQ: u64 = 0;

pub struct SessionHost {
    config: Config,
    /// `None` until the first `init` or `openFile`
    session: Option<Session>,
}

impl SessionHost {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Handle one request and produce its response
    pub fn handle(&mut self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope { seq, request } = envelope;
        let action = request.action();
        log_debug(&format!("Handling {} (seq {})", action, seq));

        let response = self.dispatch(request).unwrap_or_else(|e| {
            if e.is_custom_query_error() {
                log_debug(&format!("Custom query failed (seq {}): {}", seq, e));
            } else {
                log_warn(&format!("{} failed (seq {}): {}", action, seq, e));
            }
            Response::error(&e)
        });
        ResponseEnvelope { seq, response }
    }

    /// Wire entry point: one JSON request in, one JSON response out
    pub fn handle_json(&mut self, message: &str) -> String {
        let response = match parse_request(message) {
            Ok(envelope) => self.handle(envelope),
            Err((seq, e)) => {
                log_warn(&format!("Rejected malformed request: {}", e));
                ResponseEnvelope {
                    seq,
                    response: Response::error(&e),
                }
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            log_error(&format!("Failed to encode response: {}", e));
            format!(
                r#"{{"seq":{},"action":"queryError","payload":{{"error":{{"message":"failed to encode response","isCustomQueryError":false}}}}}}"#,
                response.seq
            )
        })
    }

    fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Init => {
                let session = Session::create(self.config.seed_demo)?.with_hex_blobs(self.config.hex_blobs);
                Ok(self.install(session))
            }
            Request::OpenFile { file } => {
                let session = Session::open(&file)?.with_hex_blobs(self.config.hex_blobs);
                Ok(self.install(session))
            }
            Request::GetTableData(view) | Request::Refresh(view) => self.table_data(&view),
            Request::Exec { query, view } => self.exec(&query, &view),
            Request::Update {
                table,
                columns,
                values,
                where_values,
            } => {
                self.ready()?.update(&table, &columns, &values, &where_values)?;
                Ok(Response::UpdateComplete {
                    kind: MutationKind::Updated,
                })
            }
            Request::Delete { table, columns, values } => {
                self.ready()?.delete(&table, &columns, &values)?;
                Ok(Response::UpdateComplete {
                    kind: MutationKind::Deleted,
                })
            }
            Request::Insert { table, columns, values } => {
                self.ready()?.insert(&table, &columns, &values)?;
                Ok(Response::InsertComplete)
            }
            Request::Download => Ok(Response::DownloadComplete {
                bytes: self.ready()?.download()?,
            }),
            Request::Export(export) => self.export(&export),
        }
    }

    fn install(&mut self, session: Session) -> Response {
        let payload = SchemaPayload::from(session.schema());
        if self.session.replace(session).is_some() {
            log_info("Replaced previous session");
        } else {
            log_info("Session host is ready");
        }
        Response::InitComplete(payload)
    }

    fn ready(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(Error::NotInitialized)
    }

    fn table_data(&mut self, view: &TableView) -> Result<Response> {
        let page = self.ready()?.get_table_data(
            &view.current_table,
            view.limit,
            view.offset,
            &view.filters,
            &view.sorters,
        )?;
        Ok(Response::QueryComplete {
            results: page.results,
            max_size: page.total_rows,
        })
    }

    /// Run every statement in `query`; the response depends on what ran.
    ///
    /// Statements before a failing one stay applied. If one of them changed
    /// the schema, the error carries the new schema.
    fn exec(&mut self, query: &str, view: &TableView) -> Result<Response> {
        let session = self.ready()?;
        let mut results = Vec::new();
        let mut schema_changed = false;
        for sql in statement::split_statements(query) {
            let outcome = match session.exec(&sql) {
                Ok(outcome) => outcome,
                Err(e) if schema_changed => {
                    log_debug(&format!("Custom query failed after a schema change: {}", e));
                    return Ok(Response::QueryError {
                        error: ErrorPayload::from(&e).with_schema(SchemaPayload::from(session.schema())),
                    });
                }
                Err(e) => return Err(e),
            };
            schema_changed |= outcome.schema_changed;
            results.extend(outcome.results);
        }

        if schema_changed {
            let schema = session.schema();
            return Ok(Response::UpdateInstance {
                table_schema: schema.tables.clone(),
                index_schema: schema.indexes.clone(),
            });
        }
        if !results.is_empty() {
            return Ok(Response::CustomQueryComplete { results });
        }
        if !session.schema().contains_table(&view.current_table) {
            // Nothing selected to re-fetch
            return Ok(Response::QueryComplete {
                results: Vec::new(),
                max_size: 0,
            });
        }
        self.table_data(view)
    }

    fn export(&mut self, export: &ExportRequest) -> Result<Response> {
        let session = self.ready()?;
        let csv = match export.export_type {
            ExportType::Table => session.export_table_as_csv(&export.table)?,
            ExportType::Current => session.export_current_data_as_csv(
                &export.table,
                export.limit,
                export.offset,
                &export.filters,
                &export.sorters,
            )?,
        };
        Ok(Response::ExportComplete { results: csv })
    }
}

/// Parse a request, recovering its `seq` for the error response if possible
fn parse_request(message: &str) -> core::result::Result<RequestEnvelope, (u64, Error)> {
    let value: serde_json::Value =
        serde_json::from_str(message).map_err(|e| (UNKNOWN_SEQ, Error::Protocol(e.to_string())))?;
    let seq = value
        .get("seq")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(UNKNOWN_SEQ);
    serde_json::from_value(value).map_err(|e| (seq, Error::Protocol(e.to_string())))
}

/// A host running on its own thread, fed through a FIFO channel
pub struct HostHandle {
    requests: Option<Sender<RequestEnvelope>>,
    responses: Receiver<ResponseEnvelope>,
    worker: Option<JoinHandle<()>>,
}

impl HostHandle {
    pub fn spawn(config: Config) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<RequestEnvelope>();
        let (response_tx, response_rx) = crossbeam_channel::unbounded::<ResponseEnvelope>();

        let worker = std::thread::Builder::new()
            .name("sqlite-session-host".into())
            .spawn(move || {
                let mut host = SessionHost::new(config);
                for envelope in request_rx {
                    if response_tx.send(host.handle(envelope)).is_err() {
                        log_debug("Response receiver dropped, stopping host");
                        break;
                    }
                }
                log_debug("Session host stopped");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
        })
    }

    /// Queue a request; returns immediately
    pub fn send(&self, envelope: RequestEnvelope) -> Result<()> {
        self.requests
            .as_ref()
            .ok_or(Error::HostClosed)?
            .send(envelope)
            .map_err(|_| Error::HostClosed)
    }

    pub fn responses(&self) -> &Receiver<ResponseEnvelope> {
        &self.responses
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log_error("Session host thread panicked");
            }
        }
    }
}
