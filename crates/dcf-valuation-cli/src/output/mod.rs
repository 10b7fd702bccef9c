pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Scalar leaves of a nested object as `(dotted.key, value)` pairs.
/// Arrays are left whole so callers can render them as sub-tables.
pub(crate) fn flatten(map: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    flatten_into("", map, &mut out);
    out
}

fn flatten_into<'a>(prefix: &str, map: &'a Map<String, Value>, out: &mut Vec<(String, &'a Value)>) {
    for (key, val) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten_into(&path, inner, out),
            _ => out.push((path, val)),
        }
    }
}

/// The `(wacc_values, terminal_growth_values, cells)` triple of a sensitivity grid.
pub(crate) fn as_grid(result: &Value) -> Option<(&Vec<Value>, &Vec<Value>, &Vec<Value>)> {
    let waccs = result.get("wacc_values")?.as_array()?;
    let growths = result.get("terminal_growth_values")?.as_array()?;
    let cells = result.get("cells")?.as_array()?;
    Some((waccs, growths, cells))
}
