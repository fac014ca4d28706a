//! Run orchestration
//!
//! [`UrlFetcher`] launches one task per URL, drains terminal results in
//! completion order, appends successes to the sink as they arrive and tallies
//! every result into the run statistics.

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::fetch::{FetchContext, fetch_one};
use crate::input::read_urls_from_file;
use crate::limiter::ConcurrencyLimiter;
use crate::retry::RetryPolicy;
use crate::stats::{RunStatistics, StatisticsAggregator};
use crate::transport::{HttpTransport, Transport};
use crate::types::{Event, FetchRequest, FetchResult, millis};
use crate::writer::{JsonlWriter, ResultSink};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Bounded-concurrency URL fetcher
///
/// One instance can execute any number of runs, one after another or
/// concurrently; each run gets its own concurrency limiter.
pub struct UrlFetcher {
    config: Config,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<Event>,
}

impl UrlFetcher {
    /// Create a fetcher that talks HTTP through reqwest
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::build(config, transport))
    }

    /// Create a fetcher over a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, transport))
    }

    fn build(config: Config, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);
        Self {
            config,
            transport,
            event_tx,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to run events
    ///
    /// Slow subscribers may miss events (the channel is bounded); the run
    /// itself never waits for them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Fetch every URL and write successes to `output` as JSON lines
    ///
    /// `output` is truncated first, so it only ever reflects the latest run.
    pub async fn fetch_urls<I, U>(
        &self,
        urls: I,
        output: impl AsRef<Path>,
    ) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = U>,
        U: Into<FetchRequest>,
    {
        self.fetch_urls_with_cancel(urls, output, CancellationToken::new())
            .await
    }

    /// Like [`fetch_urls`](Self::fetch_urls), aborting outstanding URLs when `cancel` fires
    pub async fn fetch_urls_with_cancel<I, U>(
        &self,
        urls: I,
        output: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = U>,
        U: Into<FetchRequest>,
    {
        let mut sink = JsonlWriter::create(output.as_ref())?;
        self.fetch_urls_into(urls, &mut sink, cancel).await
    }

    /// Run against an arbitrary sink
    ///
    /// Per-URL failures never surface as `Err`; only sink failures do, and they
    /// abort the run.
    pub async fn fetch_urls_into<I, U>(
        &self,
        urls: I,
        sink: &mut dyn ResultSink,
        cancel: CancellationToken,
    ) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = U>,
        U: Into<FetchRequest>,
    {
        let requests: Vec<FetchRequest> = urls.into_iter().map(Into::into).collect();
        let aggregator = StatisticsAggregator::new(requests.len());
        let _ = self.event_tx.send(Event::RunStarted {
            total: requests.len(),
        });

        if requests.is_empty() {
            tracing::warn!("No URLs to fetch");
            return Ok(self.finish(aggregator, false));
        }

        let ctx = FetchContext {
            transport: Arc::clone(&self.transport),
            limiter: ConcurrencyLimiter::new(self.config.max_concurrent),
            policy: RetryPolicy::from_config(&self.config.retry),
            timeout: self.config.timeout,
            events: self.event_tx.clone(),
            cancel: cancel.child_token(),
        };

        tracing::info!(
            total = requests.len(),
            max_concurrent = ctx.limiter.capacity(),
            max_retries = ctx.policy.max_retries(),
            timeout_ms = millis(ctx.timeout),
            "Starting fetch run"
        );

        let mut tasks = JoinSet::new();
        let mut urls_by_task = HashMap::with_capacity(requests.len());
        for request in requests {
            let url = request.url.clone();
            let ctx = ctx.clone();
            let handle = tasks.spawn(async move { fetch_one(&ctx, request).await });
            urls_by_task.insert(handle.id(), url);
        }

        let mut cancelled = false;
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => {
                    tracing::warn!(
                        outstanding = tasks.len(),
                        "Fetch run cancelled, aborting outstanding URLs"
                    );
                    cancelled = true;
                    ctx.limiter.close();
                    tasks.abort_all();
                    continue;
                }
                joined = tasks.join_next_with_id() => joined,
            };

            let result = match joined {
                None => break,
                Some(Ok((id, outcome))) => {
                    urls_by_task.remove(&id);
                    match outcome {
                        Some(result) => result,
                        // Cancelled before reaching a terminal result
                        None => continue,
                    }
                }
                Some(Err(e)) if e.is_cancelled() => continue,
                Some(Err(e)) => {
                    let url = urls_by_task.remove(&e.id()).unwrap_or_default();
                    let error = FetchError::Unexpected(panic_message(e));
                    FetchResult::failed(url, error, Duration::ZERO)
                }
            };

            self.complete(result, sink, &aggregator)?;
        }

        Ok(self.finish(aggregator, cancelled))
    }

    /// Persist, log and count one terminal result
    fn complete(
        &self,
        result: FetchResult,
        sink: &mut dyn ResultSink,
        aggregator: &StatisticsAggregator,
    ) -> Result<()> {
        let elapsed_ms = millis(result.elapsed);
        if result.success {
            sink.append(&result)?;
            tracing::info!(url = %result.url, elapsed_ms, "Fetched");
            let _ = self.event_tx.send(Event::Fetched {
                url: result.url.clone(),
                elapsed_ms,
            });
        } else {
            let error = result.error.clone().unwrap_or_default();
            tracing::warn!(url = %result.url, error = %error, elapsed_ms, "Fetch failed");
            let _ = self.event_tx.send(Event::Failed {
                url: result.url.clone(),
                error,
                elapsed_ms,
            });
        }
        aggregator.record(&result);
        Ok(())
    }

    fn finish(&self, aggregator: StatisticsAggregator, cancelled: bool) -> RunStatistics {
        let stats = aggregator.finish(cancelled);
        let _ = self.event_tx.send(Event::RunFinished {
            stats: stats.clone(),
        });
        stats
    }
}

/// Read URLs from `input`, fetch them into `output` and log a summary
///
/// `limit` caps the number of URLs taken from the file.
pub async fn fetch_urls_from_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: Config,
    limit: Option<usize>,
) -> Result<RunStatistics> {
    let urls = read_urls_from_file(input.as_ref(), limit).await?;
    if urls.is_empty() {
        tracing::warn!(input = %input.as_ref().display(), "No URLs found in input file");
    } else {
        tracing::info!(count = urls.len(), limit = ?limit, "Found URLs to process");
    }

    let fetcher = UrlFetcher::new(config)?;
    let stats = fetcher.fetch_urls(urls, output.as_ref()).await.inspect_err(|e| {
        tracing::error!(error = %e, "Fatal error during fetch run");
    })?;
    stats.log_summary(output.as_ref());
    Ok(stats)
}

fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string()),
        Err(error) => error.to_string(),
    }
}
