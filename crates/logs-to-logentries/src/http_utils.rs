// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use core::time::Duration;
use http_body_util::Full;
use hyper::{
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use tracing::{debug, error};

pub type HttpResponse = Response<Full<Bytes>>;

/// Does two things:
/// 1. Logs the given message. A success status code (within 200-299) will cause a debug log to be
///    written, otherwise error will be written.
/// 2. Returns the given message in the body of JSON response with the given status code.
///
/// Response body format:
/// {
///     "message": message
/// }
pub fn log_and_create_http_response(message: &str, status: StatusCode) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// Serializes `value` as the JSON body of a response with the given status code.
pub fn create_json_response<T: Serialize>(
    value: &T,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body))),
        Err(e) => log_and_create_http_response(
            &format!("Failed to serialize response body: {e}"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Takes a request's header map, and verifies that the "content-length" header, when present, is
/// valid and not above the given max_content_length.
///
/// A request without a length is accepted: it either has no body or is chunked, and the body read
/// is bounded separately. Will return None if no issues are found. Otherwise logs an error (with
/// the given prefix) and returns an HTTP Response with the appropriate error status code.
pub fn verify_request_content_length(
    header_map: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let Some(content_length_header) = header_map.get(header::CONTENT_LENGTH) else {
        debug!(
            "No Content-Length header, Transfer-Encoding: {:?}",
            header_map.get(header::TRANSFER_ENCODING)
        );
        return None;
    };
    let content_length = match content_length_header
        .to_str()
        .ok()
        .and_then(|len| len.parse::<usize>().ok())
    {
        Some(res) => res,
        None => {
            return Some(log_and_create_http_response(
                &format!("{error_message_prefix}: Invalid Content-Length header"),
                StatusCode::BAD_REQUEST,
            ));
        }
    };
    if content_length > max_content_length {
        return Some(log_and_create_http_response(
            &format!("{error_message_prefix}: Payload too large"),
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    None
}

/// Builds a reqwest client with optional proxy configuration and timeout, using rustls TLS.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}
