// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Daily digest scheduling.
//!
//! The digest is not driven by its own timer. Every scheduled run checks whether the current
//! wall-clock time falls inside a short window starting at the configured `HH:MM`; with a polling
//! cadence of at most [`DIGEST_WINDOW_MINUTES`] minutes this fires the digest about once a day.
//! There is no exactly-once guarantee.

use chrono::{DateTime, Local, Timelike};

/// Width of the window, starting at the configured minute, in which a run fires the digest
pub const DIGEST_WINDOW_MINUTES: u32 = 5;

/// Length of the period covered by a digest, in milliseconds
pub const DIGEST_PERIOD_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTime {
    pub hour: u32,
    pub minute: u32,
}

impl ReportTime {
    /// Parses a `HH:MM` trigger time.
    ///
    /// Only the leading digits of the hour and minute are read, so `09:00:00` and `9:00am` both
    /// mean 09:00. Returns `None` when either part has no leading digits or is out of range,
    /// which disables the digest.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let hour = parse_component(parts.next()?)?;
        let minute = parse_component(parts.next()?)?;
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(ReportTime { hour, minute })
    }

    /// True when `now` falls within `[HH:MM, HH:MM + 5)` on the same hour.
    pub fn is_due<T: Timelike>(&self, now: &T) -> bool {
        now.hour() == self.hour
            && now.minute() >= self.minute
            && now.minute() < self.minute + DIGEST_WINDOW_MINUTES
    }
}

// leading whitespace is skipped, anything after the leading digits is ignored
fn parse_component(raw: &str) -> Option<u32> {
    let raw = raw.trim_start();
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// Start and end, in epoch milliseconds, of the rolling 24 hour period ending at `now`
pub fn report_period(now: &DateTime<Local>) -> (i64, i64) {
    let end = now.timestamp_millis();
    (end - DIGEST_PERIOD_MS, end)
}

/// Source of the current wall-clock time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
