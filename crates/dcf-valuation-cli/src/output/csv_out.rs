use serde_json::Value;
use std::io;

use super::{as_grid, flatten};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A sensitivity grid is written as a matrix with terminal growth across the
/// top; a projection is written one row per year; anything else becomes
/// `field,value` pairs with dotted keys.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some((waccs, growths, cells)) = as_grid(result) {
        write_grid(&mut wtr, waccs, growths, cells);
    } else if let Some(Value::Array(years)) = result.get("projections") {
        write_records(&mut wtr, years);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in flatten(map) {
            if !val.is_array() {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
    } else if let Value::Array(arr) = result {
        write_records(&mut wtr, arr);
    } else {
        let _ = wtr.write_record([&format_csv_value(result)]);
    }

    let _ = wtr.flush();
}

fn write_grid(wtr: &mut StdoutWriter<'_>, waccs: &[Value], growths: &[Value], cells: &[Value]) {
    let mut header = vec!["wacc".to_string()];
    header.extend(growths.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    for (w, row) in waccs.iter().zip(cells) {
        let mut record = vec![format_csv_value(w)];
        if let Value::Array(values) = row {
            record.extend(values.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_records(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
