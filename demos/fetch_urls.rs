//! Fetch a URL list file into a JSON-lines file
//!
//! Settings come from environment variables:
//! - `FETCH_INPUT` (default `urls.csv`): one URL per line, optional `url` header
//! - `FETCH_OUTPUT` (default `result.jsonl`)
//! - `FETCH_LIMIT`: only process the first N URLs
//! - `FETCH_CONCURRENT` (default 5), `FETCH_TIMEOUT_SECS` (default 30),
//!   `FETCH_RETRIES` (default 2)
//!
//! ```bash
//! RUST_LOG=info FETCH_INPUT=urls.csv cargo run --example fetch_urls
//! ```
//!
//! Ctrl+C stops the run early; statistics still cover every finished URL.

use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use url_fetcher::input::read_urls_from_file;
use url_fetcher::{Config, Event, UrlFetcher, shutdown_token};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let input = std::env::var("FETCH_INPUT").unwrap_or_else(|_| "urls.csv".to_string());
    let output = std::env::var("FETCH_OUTPUT").unwrap_or_else(|_| "result.jsonl".to_string());
    let limit = std::env::var("FETCH_LIMIT").ok().and_then(|v| v.parse().ok());

    let mut config = Config {
        max_concurrent: env_or("FETCH_CONCURRENT", 5),
        timeout: Duration::from_secs(env_or("FETCH_TIMEOUT_SECS", 30)),
        ..Default::default()
    };
    config.retry.max_retries = env_or("FETCH_RETRIES", 2);

    let urls = read_urls_from_file(&input, limit).await?;
    if urls.is_empty() {
        println!("No URLs found in {input}");
        return Ok(());
    }
    println!("Fetching {} URLs from {input}", urls.len());

    let fetcher = UrlFetcher::new(config)?;

    // Print a compact progress line per finished URL
    let mut events = fetcher.subscribe();
    tokio::spawn(async move {
        let mut done = 0usize;
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("(progress display skipped {skipped} events)");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match event {
                Event::Fetched { url, elapsed_ms } => {
                    done += 1;
                    println!("[{done}] ok     {url} ({elapsed_ms} ms)");
                }
                Event::Failed { url, error, .. } => {
                    done += 1;
                    println!("[{done}] failed {url} - {error}");
                }
                Event::RunFinished { .. } => break,
                _ => {}
            }
        }
    });

    let stats = fetcher
        .fetch_urls_with_cancel(urls, &output, shutdown_token())
        .await?;
    stats.log_summary(Path::new(&output));

    println!();
    println!("Total:      {}", stats.total);
    println!("Successful: {}", stats.successful);
    println!("Failed:     {}", stats.failed);
    if let Some(rate) = stats.success_rate() {
        println!("Success:    {:.1}%", rate * 100.0);
    }
    println!("Time:       {:.2}s", stats.total_time.as_secs_f64());
    if stats.cancelled {
        println!("Run was interrupted before every URL finished");
    }
    println!("Results saved to {output}");
    Ok(())
}
