// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Seams towards the log retrieval collaborator.
//!
//! Fetching logs from the Auth0 management API, paginating, deduplicating and persisting the
//! checkpoint all belong to the collaborator behind [`LogsProcessor`]. This crate only hands it
//! an explicit [`CheckpointStorage`], the [`ProcessorOptions`] read from configuration, and a
//! [`BatchHandler`] to call for every batch. The collaborator must only advance its checkpoint
//! once the handler returned `Ok` for the batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ForwarderError;
use crate::log_entry::LogEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorOptions {
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub batch_size: u32,
    pub start_from: Option<String>,
    pub log_types: Vec<String>,
    pub log_level: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Run,
    Report,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    #[serde(rename = "type", default)]
    pub kind: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs_processed: u64,
    #[serde(default)]
    pub warnings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of failed runs over a digest period. Only set on reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_runs: Option<u64>,
}

impl RunStatus {
    /// Status reported when a run aborted before producing a result
    pub fn failed(err: &ForwarderError) -> Self {
        RunStatus {
            error: Some(err.to_string()),
            logs_processed: 0,
            ..Default::default()
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a retrieval run, returned as-is to the caller of the endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub checkpoint: Option<String>,
}

/// Summary of the logs processed over a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub processed: u64,
    pub warnings: u64,
    pub errors: u64,
    pub checkpoint: Option<String>,
}

impl Report {
    pub fn status(&self) -> RunStatus {
        RunStatus {
            kind: StatusKind::Report,
            start: Some(self.start),
            end: Some(self.end),
            logs_processed: self.processed,
            warnings: self.warnings,
            error: None,
            failed_runs: Some(self.errors),
        }
    }
}

/// Upload callback invoked by the collaborator for every batch of new logs
#[async_trait]
pub trait BatchHandler {
    async fn handle_batch(&self, logs: &[LogEntry]) -> Result<(), ForwarderError>;
}

#[async_trait]
pub trait LogsProcessor {
    /// Streams every log since the stored checkpoint through `handler`, batch by batch.
    async fn run(
        &self,
        handler: &(dyn BatchHandler + Send + Sync),
    ) -> Result<RunResult, ForwarderError>;

    /// Builds a report covering `[start_ms, end_ms]`, both in epoch milliseconds.
    async fn get_report(&self, start_ms: i64, end_ms: i64) -> Result<Report, ForwarderError>;
}

/// Builds a retrieval collaborator for one invocation
pub trait ProcessorFactory {
    fn create(
        &self,
        storage: Arc<dyn CheckpointStorage + Send + Sync>,
        options: ProcessorOptions,
    ) -> Arc<dyn LogsProcessor + Send + Sync>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(
        Arc<dyn CheckpointStorage + Send + Sync>,
        ProcessorOptions,
    ) -> Arc<dyn LogsProcessor + Send + Sync>,
{
    fn create(
        &self,
        storage: Arc<dyn CheckpointStorage + Send + Sync>,
        options: ProcessorOptions,
    ) -> Arc<dyn LogsProcessor + Send + Sync> {
        self(storage, options)
    }
}

/// Storage handle the collaborator persists its checkpoint state through
#[async_trait]
pub trait CheckpointStorage {
    async fn read(&self) -> Result<Option<Value>, ForwarderError>;
    async fn write(&self, data: Value) -> Result<(), ForwarderError>;
}

/// Process-local storage, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<Value>, ForwarderError> {
        Ok(self.data.lock().await.clone())
    }

    async fn write(&self, data: Value) -> Result<(), ForwarderError> {
        *self.data.lock().await = Some(data);
        Ok(())
    }
}
