//! Request/response behaviour across the session host boundary

use serde_json::{json, Value as Json};
use sqlite_wasm_viewer::{CellValue, Client, Config, SessionHost, SortDirection};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn call(host: &mut SessionHost, request: Json) -> Json {
    let reply = host.handle_json(&request.to_string());
    serde_json::from_str(&reply).expect("host replied with invalid JSON")
}

fn view(table: &str) -> Json {
    json!({"currentTable": table, "limit": 2, "offset": 0, "filters": {}, "sorters": {}})
}

#[test]
fn test_requests_before_init_are_rejected() {
    let mut host = SessionHost::new(Config::default());
    let reply = call(&mut host, json!({"seq": 1, "action": "getTableData", "payload": view("customers")}));
    assert_eq!(reply["seq"], 1);
    assert_eq!(reply["action"], "queryError");
    assert_eq!(reply["payload"]["error"]["isCustomQueryError"], false);
}

#[test]
fn test_page_request_over_json() {
    let mut host = SessionHost::new(Config::default());
    call(&mut host, json!({"seq": 1, "action": "init"}));

    let mut payload = view("customers");
    payload["sorters"] = json!({"id": "desc"});
    let reply = call(&mut host, json!({"seq": 2, "action": "getTableData", "payload": payload}));
    assert_eq!(reply["action"], "queryComplete");
    assert_eq!(reply["payload"]["maxSize"], 4);
    assert_eq!(reply["payload"]["results"][0]["columns"][0], "id");
    assert_eq!(reply["payload"]["results"][0]["values"][0][0], 4);
    assert_eq!(reply["payload"]["results"][0]["values"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_exec_routes_by_statement_kind() {
    let mut host = SessionHost::new(Config::default());
    call(&mut host, json!({"seq": 1, "action": "init"}));

    let mut exec = |seq: u64, query: &str, table: &str| {
        let mut payload = view(table);
        payload["query"] = json!(query);
        call(&mut host, json!({"seq": seq, "action": "exec", "payload": payload}))
    };

    let reply = exec(2, "CREATE TABLE tags (label TEXT); /* seed */ INSERT INTO tags VALUES ('a;b')", "customers");
    assert_eq!(reply["action"], "updateInstance");
    assert!(reply["payload"]["tableSchema"]["tags"].is_array());

    let reply = exec(3, "SELECT label FROM tags", "tags");
    assert_eq!(reply["action"], "customQueryComplete");
    assert_eq!(reply["payload"]["results"][0]["values"][0][0], "a;b");

    let reply = exec(4, "DELETE FROM tags", "tags");
    assert_eq!(reply["action"], "queryComplete");
    assert_eq!(reply["payload"]["maxSize"], 0);
    assert_eq!(reply["payload"]["results"], json!([]));

    let reply = exec(5, "SELEC nonsense", "tags");
    assert_eq!(reply["seq"], 5);
    assert_eq!(reply["action"], "queryError");
    assert_eq!(reply["payload"]["error"]["isCustomQueryError"], true);
}

#[test]
fn test_unrecognized_action_gets_typed_error() {
    let mut host = SessionHost::new(Config::default());
    let reply = call(&mut host, json!({"seq": 8, "action": "dropEverything"}));
    assert_eq!(reply["seq"], 8);
    assert_eq!(reply["action"], "queryError");
    assert!(reply["payload"]["error"]["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Protocol error")));
}

#[test]
fn test_export_current_view_over_json() {
    let mut host = SessionHost::new(Config::default());
    call(&mut host, json!({"seq": 1, "action": "init"}));
    let reply = call(
        &mut host,
        json!({"seq": 2, "action": "export", "payload": {
            "table": "customers", "offset": 1, "limit": 1,
            "filters": {}, "sorters": {}, "exportType": "current"
        }}),
    );
    assert_eq!(reply["action"], "exportComplete");
    let csv = reply["payload"]["results"].as_str().unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Bob Chen"));
}

#[test]
fn test_table_switch_resets_view() {
    let mut client = Client::new(Config::default()).unwrap();
    client.init().unwrap();
    client.wait_idle(WAIT).unwrap();

    client.set_filter("name", "a");
    client.toggle_sort("name").unwrap();
    client.wait_idle(WAIT).unwrap();
    assert!(client.state().filters.is_active());
    assert_eq!(client.state().sorters.get("name"), Some(SortDirection::Asc));

    client.select_table("products").unwrap();
    client.wait_idle(WAIT).unwrap();
    let state = client.state();
    assert_eq!(state.current_table.as_deref(), Some("products"));
    assert!(!state.filters.is_active());
    assert!(state.sorters.is_empty());
    assert_eq!(state.cursor.offset, 0);
    assert_eq!(state.columns[0], "id");
}

#[test]
fn test_filter_edits_merge() {
    let mut client = Client::new(Config::default()).unwrap();
    client.init().unwrap();
    client.wait_idle(WAIT).unwrap();

    client.set_filter("name", "a");
    client.set_filter("email", "example");
    client.wait_idle(WAIT).unwrap();
    let state = client.state();
    assert_eq!(state.filters.get("name"), Some("a"));
    assert_eq!(state.filters.get("email"), Some("example"));
    // Bob's name has no "a" and Carla has no email
    assert_eq!(state.total_rows, 2);
}

#[test]
fn test_client_pagination() {
    let config = Config {
        rows_per_page: 3,
        ..Config::default()
    };
    let mut client = Client::new(config).unwrap();
    client.init().unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().rows.len(), 3);

    client.next_page().unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().cursor.offset, 3);
    assert_eq!(client.state().rows.len(), 1);

    // Already on the final page
    client.next_page().unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().cursor.offset, 3);

    client.first_page().unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().rows[0][0], CellValue::Integer(1));

    client.last_page().unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().cursor.offset, 1);

    client.set_rows_per_page(2).unwrap();
    client.wait_idle(WAIT).unwrap();
    assert_eq!(client.state().cursor.offset, 0);
    assert_eq!(client.state().rows.len(), 2);
}

#[test]
fn test_download_and_export_artifacts() {
    let mut client = Client::new(Config::default()).unwrap();
    client.init().unwrap();
    client.wait_idle(WAIT).unwrap();

    client.download().unwrap();
    client.export(sqlite_wasm_viewer::protocol::ExportType::Table).unwrap();
    client.wait_idle(WAIT).unwrap();

    let state = client.state();
    assert!(state
        .last_download
        .as_ref()
        .is_some_and(|bytes| bytes.starts_with(b"SQLite format 3\0")));
    assert_eq!(state.last_export.as_ref().map(|csv| csv.lines().count()), Some(5));
}
