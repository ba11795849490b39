//! Browse a SQLite database through the client facade
//!
//! With no argument the demo dataset is shown. A path may point at a
//! database file or at a plain SQL script.

use sqlite_wasm_viewer::{init_logger, CellValue, Client, Config, Error};
use std::env;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(30);

fn main() -> Result<(), Error> {
    let config = Config::default().with_env_overrides()?;
    init_logger(config.log_level);

    let mut client = Client::new(config)?;
    match env::args().nth(1) {
        Some(path) => {
            println!("Opening: {}", path);
            client.open_file(std::fs::read(&path)?)?;
        }
        None => {
            println!("No file given, loading the demo dataset");
            client.init()?;
        }
    }
    client.wait_idle(WAIT)?;

    if let Some(error) = &client.state().error {
        eprintln!("Failed to load: {}", error);
        std::process::exit(1);
    }

    let tables: Vec<String> = client.state().schema.keys().cloned().collect();
    println!("\nTables in the database:");
    for table in &tables {
        let columns = &client.state().schema[table];
        let described = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.declared_type))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  - {} ({})", table, described);
    }
    for index in &client.state().indexes {
        println!("  index {} on {}", index.name, index.table_name);
    }

    for table in &tables {
        client.select_table(table)?;
        client.wait_idle(WAIT)?;

        let state = client.state();
        println!("\n--- Table: {} ({} rows) ---", table, state.total_rows);
        if state.rows.is_empty() {
            println!("  (empty table)");
            continue;
        }
        println!("  {}", state.columns.join(" | "));
        for row in &state.rows {
            let cells = row.iter().map(format_value).collect::<Vec<_>>();
            println!("  {}", cells.join(" | "));
        }
        if state.cursor.has_next(state.total_rows) {
            println!("  ... and {} more rows", state.total_rows - state.rows.len() as u64);
        }
    }

    Ok(())
}

/// Format a value for display
fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Text(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}
