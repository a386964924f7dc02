//! Dot-file reading and rendering.

use std::fs;
use std::path::Path;

use log::debug;

use crate::collection::EnvCollection;
use crate::error::Result;

/// Read the dot-file at `path`, or `None` when it does not exist yet.
pub fn read_baseline(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        debug!("No dot-file at {}, starting empty", path.display());
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}

/// One line per record, each newline-terminated.
pub fn render(collection: &EnvCollection) -> String {
    let mut text = String::new();
    for record in collection.iter() {
        text.push_str(&record.to_string());
        text.push('\n');
    }
    text
}

/// `text` with right-padded 1-based line numbers, as shown by `--display`.
///
/// A final empty numbered line marks where the file ends.
pub fn numbered(text: &str) -> String {
    let count = text.lines().count();
    let digits = count.max(1).to_string().len();
    let mut listing: String = text
        .lines()
        .enumerate()
        .map(|(idx, line)| format!("{:<digits$} | {}\n", idx + 1, line, digits = digits))
        .collect();
    listing.push_str(&format!("{:<digits$} |\n", count + 1, digits = digits));
    listing
}
