use serde_json::Value;
use std::io::{self, Read};

/// Read a piped input document from stdin, JSON first and YAML as fallback.
/// Returns None when stdin is an interactive terminal or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_document(&buffer)
}

fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => serde_yaml::from_str::<Value>(trimmed)
            .map(Some)
            .map_err(|_| format!("stdin is neither valid JSON nor YAML: {json_err}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_and_yaml() {
        let json = parse_document(r#"{"trial_count": 100}"#).unwrap().unwrap();
        let yaml = parse_document("trial_count: 100\n").unwrap().unwrap();
        assert_eq!(json, yaml);
    }

    #[test]
    fn test_blank_is_none() {
        assert!(parse_document("   \n").unwrap().is_none());
    }
}
