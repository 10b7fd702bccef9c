use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use dcf_valuation_core::Currency;

use super::{as_grid, flatten};

/// Scalar lists longer than this are summarised instead of printed inline.
const MAX_INLINE_VALUES: usize = 20;

/// Format output as tables: scalar fields first, then one table per list of
/// records (projections, discounted cash flows, histogram), or the
/// sensitivity matrix.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result(result, map),
            None => print_fields(map),
        },
        Value::Array(arr) => print_records("", arr),
        _ => println!("{value}"),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    if let Some((waccs, growths, cells)) = as_grid(result) {
        print_grid(waccs, growths, cells);
    }
    if let Value::Object(res_map) = result {
        print_fields(res_map);
    } else if let Value::Array(arr) = result {
        print_records("", arr);
    } else {
        println!("{result}");
    }

    if let Some(currency) = result
        .get("currency")
        .and_then(|c| serde_json::from_value::<Currency>(c.clone()).ok())
    {
        println!("\nAmounts in {}", currency.symbol());
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_fields(map: &Map<String, Value>) {
    let flat = flatten(map);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut record_lists = Vec::new();
    for (key, val) in &flat {
        match val {
            Value::Array(arr) if arr.iter().any(Value::is_object) => record_lists.push((key, arr)),
            Value::Array(arr) if arr.iter().any(Value::is_array) => {}
            Value::Array(arr) if arr.len() > MAX_INLINE_VALUES => {
                builder.push_record([key.as_str(), &format!("{} values", arr.len())]);
            }
            _ => {
                builder.push_record([key.as_str(), &format_value(val)]);
            }
        }
    }
    println!("{}", Table::from(builder));

    for (key, arr) in record_lists {
        print_records(key, arr);
    }
}

fn print_records(title: &str, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };
    if !title.is_empty() {
        println!("\n{title}:");
    }

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_grid(waccs: &[Value], growths: &[Value], cells: &[Value]) {
    let mut builder = Builder::default();
    let mut header = vec!["WACC \\ g".to_string()];
    header.extend(growths.iter().map(format_value));
    builder.push_record(header);

    for (w, row) in waccs.iter().zip(cells) {
        let mut record = vec![format_value(w)];
        if let Value::Array(values) = row {
            record.extend(values.iter().map(|v| match v {
                Value::Null => "n/a".to_string(),
                _ => format_value(v),
            }));
        }
        builder.push_record(record);
    }
    println!("{}\n", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
