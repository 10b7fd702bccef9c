pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a command's input document from `--input`, falling back to piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path);
    }
    match stdin::read_stdin()? {
        Some(data) => Ok(serde_json::from_value(data)?),
        None => {
            Err(format!("--input <file.json|file.yaml> or stdin required for {command}").into())
        }
    }
}
