use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One name per line; blank lines and surrounding whitespace ignored.
pub fn parse_names(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a name list, treating a missing file as empty.
pub fn load_names(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(data) => {
            let names = parse_names(&data);
            info!("[ROSTER] {} names from {}", names.len(), path.display());
            names
        }
        Err(e) => {
            warn!("[ROSTER] could not read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
