// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors that can occur while forwarding a run of audit logs
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("Log {id} has an invalid date: {date}")]
    InvalidTimestamp { id: String, date: String },

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Logentries rejected the log with status {status}: {body}")]
    Sink { status: StatusCode, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Log retrieval failed: {0}")]
    Retrieval(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Upload task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ForwarderError::Retrieval("Too Many Requests".to_string());
        assert_eq!(error.to_string(), "Log retrieval failed: Too Many Requests");
    }

    #[test]
    fn test_invalid_timestamp_display() {
        let error = ForwarderError::InvalidTimestamp {
            id: "abc".to_string(),
            date: "yesterday".to_string(),
        };
        assert_eq!(error.to_string(), "Log abc has an invalid date: yesterday");
    }

    #[test]
    fn test_sink_display() {
        let error = ForwarderError::Sink {
            status: StatusCode::BAD_REQUEST,
            body: "bad token".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Logentries rejected the log with status 400 Bad Request: bad token"
        );
    }

    #[test]
    fn test_serialize_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: ForwarderError = json_err.into();
        assert!(matches!(error, ForwarderError::Serialize(_)));
    }
}
