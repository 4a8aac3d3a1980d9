// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::digest::{report_period, Clock};
use crate::error::ForwarderError;
use crate::notifier::Notifier;
use crate::processor::{
    CheckpointStorage, LogsProcessor, ProcessorFactory, RunResult, RunStatus,
};
use crate::trigger::{classify, InvocationContext};
use crate::uploader::{LogSink, Uploader};

#[derive(Debug)]
pub enum ForwarderOutcome {
    /// Not a scheduled invocation, handed back untouched for the next stage
    PassThrough(InvocationContext),
    Completed(RunResult),
    /// The run failed. The failure has already been notified, the error is left to the caller's
    /// generic error path.
    Failed(ForwarderError),
}

pub struct ScheduledForwarder {
    pub config: Arc<Config>,
    pub storage: Arc<dyn CheckpointStorage + Send + Sync>,
    pub processor_factory: Arc<dyn ProcessorFactory + Send + Sync>,
    pub sink: Arc<dyn LogSink + Send + Sync>,
    pub notifier: Arc<dyn Notifier + Send + Sync>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl ScheduledForwarder {
    pub async fn handle(&self, ctx: InvocationContext) -> ForwarderOutcome {
        let trigger = classify(&ctx);
        if !trigger.should_process() {
            debug!("Invocation is not a scheduled run, passing it through");
            return ForwarderOutcome::PassThrough(ctx);
        }

        let now = Instant::now();
        info!("Starting {:?} run", trigger);

        let processor = self
            .processor_factory
            .create(Arc::clone(&self.storage), self.config.processor_options());
        let uploader = Uploader::new(Arc::clone(&self.sink));

        match processor.run(&uploader).await {
            Ok(result) => {
                info!(
                    "Run finished in {} ms: {} logs processed",
                    now.elapsed().as_millis(),
                    result.status.logs_processed
                );
                if result.status.has_error() || self.config.slack_send_success {
                    self.notify(&result.status, result.checkpoint.as_deref())
                        .await;
                }
                self.send_daily_report(processor.as_ref()).await;
                ForwarderOutcome::Completed(result)
            }
            Err(e) => {
                error!("Run failed after {} ms: {e}", now.elapsed().as_millis());
                self.notify(&RunStatus::failed(&e), None).await;
                ForwarderOutcome::Failed(e)
            }
        }
    }

    async fn send_daily_report(&self, processor: &(dyn LogsProcessor + Send + Sync)) {
        let Some(report_time) = self.config.daily_report_time else {
            return;
        };
        let now = self.clock.now();
        if !report_time.is_due(&now) {
            return;
        }

        let (start, end) = report_period(&now);
        debug!("Sending daily report for {start}..{end}");
        match processor.get_report(start, end).await {
            Ok(report) => {
                self.notify(&report.status(), report.checkpoint.as_deref())
                    .await
            }
            Err(e) => warn!("Unable to build daily report: {e}"),
        }
    }

    // notification failures never change the outcome of a run
    async fn notify(&self, status: &RunStatus, checkpoint: Option<&str>) {
        if let Err(e) = self.notifier.send(status, checkpoint).await {
            warn!("Unable to send notification: {e}");
        }
    }
}
