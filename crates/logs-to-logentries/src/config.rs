// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

use crate::digest::ReportTime;
use crate::processor::ProcessorOptions;

const DEFAULT_LOGENTRIES_URL: &str = "https://webhook.logentries.com/noformat/logs";
const DEFAULT_BATCH_SIZE: u32 = 100;
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOGENTRIES_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub auth0_domain: String,
    pub auth0_client_id: String,
    pub auth0_client_secret: String,
    /// number of logs the retrieval collaborator hands to each upload callback
    pub batch_size: u32,
    /// log id to start from when no checkpoint has been stored yet
    pub start_from: Option<String>,
    pub log_types: Vec<String>,
    /// minimum Auth0 log severity to forward
    pub log_level: Option<u32>,
    /// Logentries webhook url, including the secret token
    pub logentries_url: String,
    /// timeout for each Logentries request, in seconds
    pub logentries_timeout_secs: u64,
    /// maximum number of attempts for a Logentries request failing at the network level
    pub logentries_max_retries: u32,
    /// base backoff between Logentries retries, in milliseconds
    pub logentries_retry_backoff_base_ms: u64,
    pub slack_incoming_webhook_url: Option<String>,
    /// send a Slack message for runs that completed without error
    pub slack_send_success: bool,
    pub daily_report_time: Option<ReportTime>,
    pub port: u16,
    pub max_request_content_length: usize,
    pub proxy_url: Option<String>,
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        let logentries_token = required("LOGENTRIES_TOKEN")?;
        let auth0_domain = required("AUTH0_DOMAIN")?;
        let auth0_client_id = required("AUTH0_CLIENT_ID")?;
        let auth0_client_secret = required("AUTH0_CLIENT_SECRET")?;

        // LOGENTRIES_URL will primarily be used for integration tests
        // overrides the webhook url prefix, the token is still appended
        let logentries_prefix =
            optional("LOGENTRIES_URL").unwrap_or_else(|| DEFAULT_LOGENTRIES_URL.to_string());
        let logentries_url = format!(
            "{}/{logentries_token}",
            logentries_prefix.trim_end_matches('/')
        );

        let batch_size = optional("BATCH_SIZE")
            .and_then(|size| size.parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let log_types = optional("LOG_TYPES")
            .map(|types| parse_log_types(&types))
            .unwrap_or_default();

        let log_level = optional("LOG_LEVEL").and_then(|level| level.parse::<u32>().ok());

        let daily_report_time = optional("DAILY_REPORT_TIME").and_then(|raw| ReportTime::parse(&raw));

        let slack_send_success = optional("SLACK_SEND_SUCCESS")
            .map(|val| val.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let port = optional("PORT")
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let logentries_timeout_secs = optional("LOGENTRIES_TIMEOUT_SECS")
            .and_then(|secs| secs.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LOGENTRIES_TIMEOUT_SECS);

        Ok(Config {
            auth0_domain,
            auth0_client_id,
            auth0_client_secret,
            batch_size,
            start_from: optional("START_FROM"),
            log_types,
            log_level,
            logentries_url,
            logentries_timeout_secs,
            logentries_max_retries: 3,
            logentries_retry_backoff_base_ms: 100,
            slack_incoming_webhook_url: optional("SLACK_INCOMING_WEBHOOK_URL"),
            slack_send_success,
            daily_report_time,
            port,
            max_request_content_length: 1024 * 1024, // 1MB in Bytes
            proxy_url: optional("HTTPS_PROXY"),
        })
    }

    /// Options handed to the retrieval collaborator on every run
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            domain: self.auth0_domain.clone(),
            client_id: self.auth0_client_id.clone(),
            client_secret: self.auth0_client_secret.clone(),
            batch_size: self.batch_size,
            start_from: self.start_from.clone(),
            log_types: self.log_types.clone(),
            log_level: self.log_level,
        }
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).ok_or_else(|| anyhow::anyhow!("{key} environment variable is not set"))
}

// empty values are treated the same as unset ones
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_log_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
