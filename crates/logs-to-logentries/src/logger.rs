// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log setup for the forwarder.
//!
//! Every line is prefixed so forwarder output can be told apart from the host's own logs:
//!
//! ```text
//! LOGS_TO_LOGENTRIES | INFO | Uploading 2023/01/02/03/90020230101.json.
//! LOGS_TO_LOGENTRIES | ERROR | upload{batch=3}: Upload failed: ...
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_PREFIX: &str = "LOGS_TO_LOGENTRIES";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "{LOG_PREFIX} | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the filter for the given level, silencing the HTTP stack's own logs
pub fn env_filter(log_level: &str) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_new(format!("h2=off,hyper=off,rustls=off,{log_level}"))
}

/// Installs the global subscriber. Fails if the level is not a valid filter or a subscriber is
/// already installed.
pub fn init(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter(&log_level.to_lowercase())?)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
