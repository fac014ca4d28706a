//! Shared test helpers: a scripted in-memory transport.

use crate::error::FetchError;
use crate::transport::{Transport, TransportResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) type Scripted = Result<TransportResponse, FetchError>;

/// 200 response carrying `value` as JSON
pub(crate) fn json_ok(value: serde_json::Value) -> Scripted {
    Ok(TransportResponse::new(200, value.to_string()))
}

/// Transport answering from a per-URL script.
///
/// The n-th call for a URL gets the n-th scripted response; once the script is
/// exhausted its last entry repeats. Unknown URLs get a connection error.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: HashMap<String, Vec<Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, url: &str, script: Vec<Scripted>) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<TransportResponse, FetchError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let index = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = match self.scripts.get(url) {
            Some(script) if !script.is_empty() => script[index.min(script.len() - 1)].clone(),
            _ => Err(FetchError::Connection(format!("no route to {url}"))),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
