// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use core::time::Duration;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::ForwarderError;
use crate::http_utils::build_client;
use crate::processor::{RunStatus, StatusKind};

pub const SLACK_USERNAME: &str = "auth0-logs-to-logentries";
pub const SLACK_TITLE: &str = "Logs To Logentries";

const ERROR_COLOR: &str = "#F35A00";
const SUCCESS_COLOR: &str = "#7CD197";
const SLACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for run and digest summaries
#[async_trait]
pub trait Notifier {
    async fn send(&self, status: &RunStatus, checkpoint: Option<&str>)
        -> Result<(), ForwarderError>;
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SlackMessage {
    pub username: String,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SlackAttachment {
    pub color: &'static str,
    pub fallback: String,
    pub text: String,
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SlackField {
    pub title: &'static str,
    pub value: String,
    pub short: bool,
}

/// Posts summaries to a Slack incoming webhook. Without a webhook every send is a no-op.
#[derive(Debug, Clone)]
pub struct SlackReporter {
    client: reqwest::Client,
    hook: Option<String>,
    username: String,
    title: String,
}

impl SlackReporter {
    pub fn new(config: &Config) -> Self {
        let client = build_client(config.proxy_url.as_deref(), SLACK_TIMEOUT).unwrap_or_else(|e| {
            error!(
                "Unable to parse proxy configuration: {}, no proxy will be used",
                e
            );
            reqwest::Client::new()
        });
        SlackReporter::with_client(client, config.slack_incoming_webhook_url.clone())
    }

    pub fn with_client(client: reqwest::Client, hook: Option<String>) -> Self {
        SlackReporter {
            client,
            hook,
            username: SLACK_USERNAME.to_string(),
            title: SLACK_TITLE.to_string(),
        }
    }

    pub fn create_message(&self, status: &RunStatus, checkpoint: Option<&str>) -> SlackMessage {
        let (color, text) = match (&status.error, status.kind) {
            (Some(_), _) => (ERROR_COLOR, format!("{} failed", self.title)),
            (None, StatusKind::Report) => (SUCCESS_COLOR, format!("{} daily report", self.title)),
            (None, StatusKind::Run) => (SUCCESS_COLOR, format!("{} completed", self.title)),
        };

        let format_time = |time: Option<chrono::DateTime<chrono::Utc>>| {
            time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        let mut fields = vec![
            SlackField {
                title: "Start",
                value: format_time(status.start),
                short: true,
            },
            SlackField {
                title: "End",
                value: format_time(status.end),
                short: true,
            },
            SlackField {
                title: "Logs processed",
                value: status.logs_processed.to_string(),
                short: true,
            },
            SlackField {
                title: "Warnings",
                value: status.warnings.to_string(),
                short: true,
            },
            SlackField {
                title: "Checkpoint",
                value: checkpoint.unwrap_or("-").to_string(),
                short: false,
            },
        ];
        if let Some(failed_runs) = status.failed_runs {
            fields.push(SlackField {
                title: "Failed runs",
                value: failed_runs.to_string(),
                short: true,
            });
        }
        if let Some(err) = &status.error {
            fields.push(SlackField {
                title: "Error",
                value: err.clone(),
                short: false,
            });
        }

        SlackMessage {
            username: self.username.clone(),
            attachments: vec![SlackAttachment {
                color,
                fallback: text.clone(),
                text,
                fields,
            }],
        }
    }
}

#[async_trait]
impl Notifier for SlackReporter {
    async fn send(
        &self,
        status: &RunStatus,
        checkpoint: Option<&str>,
    ) -> Result<(), ForwarderError> {
        let Some(hook) = &self.hook else {
            debug!("Slack | No incoming webhook configured, skipping notification");
            return Ok(());
        };

        let message = self.create_message(status, checkpoint);
        let response = self.client.post(hook).json(&message).send().await?;
        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForwarderError::Notification(format!(
                "Slack returned {code}: {body}"
            )));
        }
        debug!("Slack | Sent notification");
        Ok(())
    }
}
