//! Instrumented in-memory transport

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url_fetcher::{FetchError, Transport, TransportResponse};

/// Scripted reply for one call
pub type Reply = Result<TransportResponse, FetchError>;

/// 200 reply with a JSON body
pub fn ok_json(body: serde_json::Value) -> Reply {
    Ok(TransportResponse::new(200, body.to_string()))
}

/// 200 reply with an arbitrary (possibly malformed) body
pub fn ok_raw(body: &str) -> Reply {
    Ok(TransportResponse::new(200, body))
}

/// Reply with a non-200 status
pub fn status(code: u16) -> Reply {
    Ok(TransportResponse::new(code, Vec::new()))
}

/// Transport that replays a script per URL and records what it saw.
///
/// Call n for a URL gets script entry n; the last entry repeats forever.
/// Every call sleeps for `latency` while counted as active.
pub struct MockTransport {
    scripts: HashMap<String, Vec<Reply>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            latency,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, url: &str, replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "script for {url} must not be empty");
        self.scripts.insert(url.to_string(), replies);
        self
    }

    /// Number of exchanges performed for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Highest number of simultaneously active exchanges observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<TransportResponse, FetchError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(url.to_string()).or_insert(0);
            *entry += 1;
            *entry - 1
        };

        tokio::time::sleep(self.latency).await;

        let reply = self
            .scripts
            .get(url)
            .map(|script| script[call.min(script.len() - 1)].clone())
            .unwrap_or_else(|| Err(FetchError::Connection(format!("unknown host for {url}"))));

        self.active.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}
