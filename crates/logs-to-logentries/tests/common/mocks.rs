// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock collaborators for driving the forwarder end to end

use async_trait::async_trait;
use chrono::{DateTime, Local};
use logs_to_logentries::{
    digest::Clock,
    error::ForwarderError,
    log_entry::LogEntry,
    notifier::Notifier,
    processor::{
        BatchHandler, CheckpointStorage, LogsProcessor, ProcessorFactory, ProcessorOptions,
        Report, RunResult, RunStatus,
    },
};
use serde_json::{json, Map};
use std::sync::{Arc, Mutex};

pub fn log_entry(id: &str) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        date: "2023-01-02T03:04:05.678Z".to_string(),
        fields: Map::new(),
    }
}

/// Processor that streams a fixed list of batches and checkpoints after each successful one
pub struct MockProcessor {
    storage: Arc<dyn CheckpointStorage + Send + Sync>,
    batches: Vec<Vec<LogEntry>>,
}

#[async_trait]
impl LogsProcessor for MockProcessor {
    async fn run(
        &self,
        handler: &(dyn BatchHandler + Send + Sync),
    ) -> Result<RunResult, ForwarderError> {
        let mut processed = 0;
        let mut checkpoint = None;
        for batch in &self.batches {
            handler.handle_batch(batch).await?;
            processed += batch.len() as u64;
            if let Some(last) = batch.last() {
                self.storage.write(json!({ "checkpointId": last.id })).await?;
                checkpoint = Some(last.id.clone());
            }
        }
        Ok(RunResult {
            status: RunStatus {
                logs_processed: processed,
                ..Default::default()
            },
            checkpoint,
        })
    }

    async fn get_report(&self, _start_ms: i64, _end_ms: i64) -> Result<Report, ForwarderError> {
        Err(ForwarderError::Retrieval("reports are not stored".to_string()))
    }
}

/// Factory handing out [`MockProcessor`]s and recording the options it was created with
pub struct MockProcessorFactory {
    pub batches: Vec<Vec<LogEntry>>,
    pub options: Mutex<Vec<ProcessorOptions>>,
}

impl MockProcessorFactory {
    pub fn new(batches: Vec<Vec<LogEntry>>) -> Self {
        MockProcessorFactory {
            batches,
            options: Mutex::new(vec![]),
        }
    }
}

impl ProcessorFactory for MockProcessorFactory {
    fn create(
        &self,
        storage: Arc<dyn CheckpointStorage + Send + Sync>,
        options: ProcessorOptions,
    ) -> Arc<dyn LogsProcessor + Send + Sync> {
        self.options.lock().unwrap().push(options);
        Arc::new(MockProcessor {
            storage,
            batches: self.batches.clone(),
        })
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<RunStatus>>,
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        status: &RunStatus,
        _checkpoint: Option<&str>,
    ) -> Result<(), ForwarderError> {
        self.sent.lock().unwrap().push(status.clone());
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
