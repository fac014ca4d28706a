//! Helpers for inspecting JSON-lines sinks

use serde_json::Value;
use std::path::Path;

/// Parse every line of a JSON-lines file
pub fn read_records(path: &Path) -> Vec<Value> {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// URLs of all records, sorted
pub fn record_urls(records: &[Value]) -> Vec<String> {
    let mut urls: Vec<String> = records
        .iter()
        .map(|r| r["url"].as_str().unwrap().to_string())
        .collect();
    urls.sort();
    urls
}

/// `content` of the record for `url`
pub fn content_for<'a>(records: &'a [Value], url: &str) -> Option<&'a Value> {
    records
        .iter()
        .find(|r| r["url"] == url)
        .map(|r| &r["content"])
}
