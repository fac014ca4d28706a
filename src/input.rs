//! URL list input
//!
//! The list is plain text with one URL per line. A first line reading `url`
//! (any case) is treated as a CSV-style header and skipped. Blank lines and
//! lines starting with `#` are ignored.

use crate::error::{Error, Result};
use std::path::Path;

/// Parse a URL list, keeping at most `limit` URLs
pub fn parse_url_list(text: &str, limit: Option<usize>) -> Vec<String> {
    let mut lines = text.lines().peekable();
    if lines
        .peek()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("url"))
    {
        lines.next();
    }

    lines
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .take(limit.unwrap_or(usize::MAX))
        .map(str::to_string)
        .collect()
}

/// Read and parse a URL list file
pub async fn read_urls_from_file(
    path: impl AsRef<Path>,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(parse_url_list(&text, limit))
}
