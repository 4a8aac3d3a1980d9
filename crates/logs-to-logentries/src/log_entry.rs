// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ForwarderError;

/// A single Auth0 audit log entry.
///
/// Only the id and date are interpreted here. Every other field is kept as received so the
/// forwarded payload matches what the retrieval collaborator handed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    pub fn timestamp(&self) -> Result<DateTime<FixedOffset>, ForwarderError> {
        DateTime::parse_from_rfc3339(&self.date).map_err(|_| ForwarderError::InvalidTimestamp {
            id: self.id.clone(),
            date: self.date.clone(),
        })
    }

    /// Destination path `<YYYY>/<MM>/<DD>/<HH>/<id>.json`, using the offset the date arrived in
    pub fn blob_path(&self) -> Result<String, ForwarderError> {
        let date = self.timestamp()?;
        Ok(format!("{}/{}.json", date.format("%Y/%m/%d/%H"), self.id))
    }

    pub fn to_payload(&self) -> Result<String, ForwarderError> {
        Ok(serde_json::to_string(self)?)
    }
}
