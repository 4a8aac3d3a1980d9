// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::env;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::config::Config;
use crate::digest::SystemClock;
use crate::forwarder::{ForwarderOutcome, ScheduledForwarder};
use crate::http_utils::{
    create_json_response, log_and_create_http_response, verify_request_content_length,
    HttpResponse,
};
use crate::logger;
use crate::notifier::SlackReporter;
use crate::processor::{CheckpointStorage, ProcessorFactory};
use crate::trigger::InvocationContext;
use crate::uploader::LogentriesClient;

/// Reads the configuration from the environment, installs logging and serves the endpoint with
/// the Logentries and Slack clients. Runs until the listener fails.
pub async fn run_from_env(
    processor_factory: Arc<dyn ProcessorFactory + Send + Sync>,
    storage: Arc<dyn CheckpointStorage + Send + Sync>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = env::var("FORWARDER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or_else(|_| "info".to_string());
    logger::init(&log_level)?;
    debug!("Logging subsystem enabled");

    let config = match Config::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on forwarder startup: {e}");
            return Err(e);
        }
    };

    let forwarder = Arc::new(ScheduledForwarder {
        config: Arc::clone(&config),
        storage,
        processor_factory,
        sink: Arc::new(LogentriesClient::new(&config)),
        notifier: Arc::new(SlackReporter::new(&config)),
        clock: Arc::new(SystemClock),
    });

    ForwarderServer { config, forwarder }.start().await
}

/// HTTP endpoint invoking the [`ScheduledForwarder`] for every request
pub struct ForwarderServer {
    pub config: Arc<Config>,
    pub forwarder: Arc<ScheduledForwarder>,
}

impl ForwarderServer {
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let now = Instant::now();
        let addr = SocketAddr::from(([127, 0, 0, 1], self.config.port));
        let listener = TcpListener::bind(&addr).await?;

        debug!("Forwarder started: listening on port {}", self.config.port);
        debug!(
            "Time taken to start the forwarder: {} ms",
            now.elapsed().as_millis()
        );

        self.serve(listener).await
    }

    /// Serves connections accepted on an already bound listener until accepting fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let forwarder = self.forwarder.clone();
        let endpoint_config = self.config.clone();

        let service = service_fn(move |req: Request<Incoming>| {
            // called for each http request
            let forwarder = forwarder.clone();
            let endpoint_config = endpoint_config.clone();
            ForwarderServer::endpoint_handler(endpoint_config, forwarder, req)
        });

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    async fn endpoint_handler(
        config: Arc<Config>,
        forwarder: Arc<ScheduledForwarder>,
        req: Request<Incoming>,
    ) -> http::Result<HttpResponse> {
        let (parts, body) = req.into_parts();

        if parts.method == Method::POST {
            if let Some(response) = verify_request_content_length(
                &parts.headers,
                config.max_request_content_length,
                "Error processing invocation",
            ) {
                return response;
            }
        }

        let body = match Limited::new(body, config.max_request_content_length)
            .collect()
            .await
        {
            Ok(collected) => parse_body(collected.to_bytes()),
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error processing invocation: Unable to read body: {e}"),
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
        };

        let ctx = InvocationContext {
            headers: parts.headers,
            body,
        };

        match forwarder.handle(ctx).await {
            ForwarderOutcome::Completed(result) => create_json_response(&result, StatusCode::OK),
            ForwarderOutcome::PassThrough(ctx) => next_stage(ctx),
            ForwarderOutcome::Failed(e) => log_and_create_http_response(
                &format!("Error processing logs: {e}"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    }
}

/// The stage after the forwarder. Nothing else is mounted, so unrecognised invocations get a 404.
fn next_stage(ctx: InvocationContext) -> http::Result<HttpResponse> {
    debug!(
        "No handler for invocation with {} headers, returning 404",
        ctx.headers.len()
    );
    create_json_response(
        &json!({ "message": "Not a scheduled invocation" }),
        StatusCode::NOT_FOUND,
    )
}

// a missing or malformed body is not an error, it just never classifies as a schedule
fn parse_body(bytes: Bytes) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring invocation body that is not JSON: {e}");
            None
        }
    }
}
