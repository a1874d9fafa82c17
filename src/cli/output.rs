//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

/// Result of a CLI command, printable as text or JSON.
pub trait CommandOutput: Serialize {
    /// Human-readable rendering.
    fn to_human(&self) -> String;

    /// JSON rendering. Defaults to the serialized value.
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `result` in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Borderless table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render a table under a count line, or a "none found" line when empty.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {noun}:\n{table}", console::style(total).bold())
}

/// Turn id arguments into the JSON value a tool caller would send.
///
/// A single argument holding a JSON array is used as-is. Otherwise each
/// argument is parsed as a JSON scalar, falling back to a string, so
/// malformed ids reach the bulk validator instead of being dropped here.
pub fn ids_to_json(args: &[String]) -> serde_json::Value {
    if let [single] = args {
        if let Ok(value @ serde_json::Value::Array(_)) = serde_json::from_str(single) {
            return value;
        }
    }
    serde_json::Value::Array(
        args.iter()
            .map(|arg| {
                serde_json::from_str(arg.trim())
                    .unwrap_or_else(|_| serde_json::Value::String(arg.clone()))
            })
            .collect(),
    )
}
