pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a request from `--input` or piped stdin, in that order.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(file::read_input(p)?)),
        None => stdin::read_stdin(),
    }
}
