// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use core::time::Duration;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::ForwarderError;
use crate::http_utils::build_client;
use crate::log_entry::LogEntry;
use crate::processor::BatchHandler;

/// Maximum number of log uploads in flight for a single batch
pub const MAX_CONCURRENT_UPLOADS: usize = 5;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_BASE_MS: u64 = 100;

/// Destination for serialized log entries
#[async_trait]
pub trait LogSink {
    async fn log(&self, payload: String) -> Result<(), ForwarderError>;
}

/// Posts log entries to a Logentries webhook, one request per entry
#[derive(Debug, Clone)]
pub struct LogentriesClient {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    retry_backoff_base_ms: u64,
}

impl LogentriesClient {
    pub fn new(config: &Config) -> Self {
        let client = build_client(
            config.proxy_url.as_deref(),
            Duration::from_secs(config.logentries_timeout_secs),
        )
        .unwrap_or_else(|e| {
            error!(
                "Unable to parse proxy configuration: {}, no proxy will be used",
                e
            );
            reqwest::Client::new()
        });
        LogentriesClient::with_client(client, config.logentries_url.clone())
            .with_retry(config.logentries_max_retries, config.logentries_retry_backoff_base_ms)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        LogentriesClient {
            client,
            url: url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_base_ms: DEFAULT_RETRY_BACKOFF_BASE_MS,
        }
    }

    pub fn with_retry(mut self, max_retries: u32, retry_backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_backoff_base_ms = retry_backoff_base_ms;
        self
    }
}

#[async_trait]
impl LogSink for LogentriesClient {
    /// Only network errors are retried. A response with a non-success status is returned as
    /// [`ForwarderError::Sink`] straight away.
    async fn log(&self, payload: String) -> Result<(), ForwarderError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let time = Instant::now();
            let response = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone())
                .send()
                .await;
            let elapsed = time.elapsed();

            match response {
                Ok(r) => {
                    let status = r.status();
                    if status.is_success() {
                        debug!("Logentries | Sent log in {} ms", elapsed.as_millis());
                        return Ok(());
                    }
                    let body = r.text().await.unwrap_or_default();
                    error!("Logentries | Request failed with status {status}: {body}");
                    return Err(ForwarderError::Sink { status, body });
                }
                Err(e) => {
                    error!("Logentries | Network error (attempt {}): {:?}", attempts, e);
                    if attempts >= self.max_retries {
                        error!(
                            "Logentries | Failed to send log after {} attempts",
                            attempts
                        );
                        return Err(e.into());
                    }
                }
            }
            // Exponential backoff
            let backoff_ms = self.retry_backoff_base_ms * 2_u64.pow(attempts - 1);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }
}

/// Upload callback handed to the retrieval collaborator.
///
/// Works through a batch with a fixed pool of in-flight uploads. The first failure is returned
/// immediately and no further uploads are started; uploads already running are left to finish on
/// their own.
pub struct Uploader {
    sink: Arc<dyn LogSink + Send + Sync>,
    max_in_flight: usize,
}

impl Uploader {
    pub fn new(sink: Arc<dyn LogSink + Send + Sync>) -> Self {
        Uploader {
            sink,
            max_in_flight: MAX_CONCURRENT_UPLOADS,
        }
    }

    fn spawn_upload(&self, log: LogEntry) -> JoinHandle<Result<(), ForwarderError>> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let path = log.blob_path()?;
            info!("Uploading {path}.");
            sink.log(log.to_payload()?).await
        })
    }
}

#[async_trait]
impl BatchHandler for Uploader {
    async fn handle_batch(&self, logs: &[LogEntry]) -> Result<(), ForwarderError> {
        if logs.is_empty() {
            return Ok(());
        }

        info!("Uploading {} logs...", logs.len());

        let mut pending = logs.iter();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.max_in_flight {
                let Some(log) = pending.next() else {
                    break;
                };
                in_flight.push(self.spawn_upload(log.clone()));
            }

            match in_flight.next().await {
                None => break,
                Some(Ok(Ok(()))) => {}
                // dropping the remaining handles detaches those uploads, it does not abort them
                Some(Ok(Err(e))) => {
                    error!("Upload failed: {e}");
                    return Err(e);
                }
                Some(Err(e)) => {
                    error!("Upload task failed: {e}");
                    return Err(ForwarderError::Task(e.to_string()));
                }
            }
        }

        info!("Upload complete.");
        Ok(())
    }
}
