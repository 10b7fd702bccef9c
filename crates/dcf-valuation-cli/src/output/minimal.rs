use serde_json::Value;

/// Headline figure for each command, most specific first.
const PRIORITY_PATHS: [&str; 7] = [
    "valuation.value_per_share",
    "base",
    "base_case_value",
    "wacc",
    "risk_free_rate",
    "total_free_cash_flow",
    "value_per_share",
];

/// Print just the headline value of a command's output.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    println!("{}", headline(result));
}

fn headline(result: &Value) -> String {
    for path in PRIORITY_PATHS {
        if let Some(val) = lookup(result, path) {
            if !val.is_null() {
                return format_minimal(val);
            }
        }
    }
    match result {
        Value::Object(map) => map
            .iter()
            .next()
            .map(|(key, val)| format!("{key}: {}", format_minimal(val)))
            .unwrap_or_default(),
        _ => format_minimal(result),
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deterministic_headline() {
        let r = json!({"wacc_used": "0.10", "valuation": {"value_per_share": "203.05"}});
        assert_eq!(headline(&r), "203.05");
    }

    #[test]
    fn test_stochastic_headline_is_median() {
        let r = json!({"bear": 150.0, "base": 201.5, "bull": 260.0});
        assert_eq!(headline(&r), "201.5");
    }

    #[test]
    fn test_fallback_first_field() {
        assert_eq!(headline(&json!({"projections": 5})), "projections: 5");
    }
}
