// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use logs_to_logentries::config::Config;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

pub fn test_config(logentries_url: String) -> Config {
    Config {
        auth0_domain: "tenant.auth0.com".to_string(),
        auth0_client_id: "client-id".to_string(),
        auth0_client_secret: "client-secret".to_string(),
        batch_size: 100,
        start_from: None,
        log_types: vec!["s".to_string()],
        log_level: Some(2),
        logentries_url,
        logentries_timeout_secs: 2,
        logentries_max_retries: 1,
        logentries_retry_backoff_base_ms: 1,
        slack_incoming_webhook_url: None,
        slack_send_success: false,
        daily_report_time: None,
        port: 0,
        max_request_content_length: 1024,
        proxy_url: None,
    }
}

/// Send an HTTP request over TCP and return the status with the JSON body
pub async fn send_tcp_request(
    port: u16,
    method: &str,
    headers: &[(&str, &str)],
    body: Option<Vec<u8>>,
) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
    let stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder()
        .uri("/")
        .method(method)
        .header("Host", "localhost")
        .header("Content-Type", "application/json");
    for (name, value) in headers {
        request_builder = request_builder.header(*name, *value);
    }

    let body = body.unwrap_or_default();
    request_builder = request_builder.header("Content-Length", body.len().to_string());
    let request = request_builder.body(Full::new(Bytes::from(body)))?;

    let response = timeout(Duration::from_secs(5), sender.send_request(request)).await??;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok((status, serde_json::from_slice(&bytes)?))
}

/// Write a raw HTTP/1.1 request, for requests the hyper client would not produce, and return the
/// whole response as text. The request should ask for `Connection: close`.
pub async fn send_raw_request(
    port: u16,
    request: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await??;
    Ok(String::from_utf8(response)?)
}
