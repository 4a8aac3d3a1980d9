// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::header::{HeaderMap, IF_NONE_MATCH, REFERER};
use serde_json::Value;

/// Referer sent by the Auth0 management dashboard when it re-checks the extension
pub const DASHBOARD_REFERER: &str = "https://manage.auth0.com/";

const ACTIVE_STATE: &str = "active";

/// Inbound invocation data the trigger decision is made from
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A cron invocation, the body carries a schedule and an active state
    Scheduled,
    /// The management dashboard re-checking the extension.
    ///
    /// This is a compatibility shim for that single caller: the dashboard never sends a schedule
    /// body, so it is recognised by its referer together with a cache validator header.
    Manual,
    Unrecognized,
}

impl Trigger {
    pub fn should_process(&self) -> bool {
        !matches!(self, Trigger::Unrecognized)
    }
}

/// Classifies an invocation. Never fails, anything that is not recognised is `Unrecognized`.
pub fn classify(ctx: &InvocationContext) -> Trigger {
    if is_active_schedule(ctx.body.as_ref()) {
        return Trigger::Scheduled;
    }
    if is_dashboard_recheck(&ctx.headers) {
        return Trigger::Manual;
    }
    Trigger::Unrecognized
}

fn is_active_schedule(body: Option<&Value>) -> bool {
    let Some(body) = body else {
        return false;
    };
    let has_schedule = body.get("schedule").is_some_and(is_truthy);
    let is_active = body.get("state").and_then(Value::as_str) == Some(ACTIVE_STATE);
    has_schedule && is_active
}

fn is_dashboard_recheck(headers: &HeaderMap) -> bool {
    let from_dashboard = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|referer| referer == DASHBOARD_REFERER);
    let has_validator = headers
        .get(IF_NONE_MATCH)
        .is_some_and(|v| !v.is_empty());
    from_dashboard && has_validator
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use serde_json::json;

    fn ctx_with_body(body: Value) -> InvocationContext {
        InvocationContext {
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    fn ctx_with_headers(headers: &[(&'static str, &str)]) -> InvocationContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, value.parse().unwrap());
        }
        InvocationContext {
            headers: map,
            body: None,
        }
    }

    #[duplicate_item(
        test_name                           body                                                expected;
        [test_active_schedule]              [json!({"schedule": "*/5 * * * *", "state": "active"})] [Trigger::Scheduled];
        [test_inactive_schedule]            [json!({"schedule": "*/5 * * * *", "state": "inactive"})] [Trigger::Unrecognized];
        [test_missing_state]                [json!({"schedule": "*/5 * * * *"})]                 [Trigger::Unrecognized];
        [test_missing_schedule]             [json!({"state": "active"})]                        [Trigger::Unrecognized];
        [test_empty_schedule]               [json!({"schedule": "", "state": "active"})]        [Trigger::Unrecognized];
        [test_null_schedule]                [json!({"schedule": null, "state": "active"})]      [Trigger::Unrecognized];
        [test_numeric_schedule]             [json!({"schedule": 5, "state": "active"})]         [Trigger::Scheduled];
        [test_zero_schedule]                [json!({"schedule": 0, "state": "active"})]         [Trigger::Unrecognized];
        [test_state_wrong_case]             [json!({"schedule": "x", "state": "ACTIVE"})]       [Trigger::Unrecognized];
        [test_body_not_an_object]           [json!(["schedule", "active"])]                     [Trigger::Unrecognized];
    )]
    #[test]
    fn test_name() {
        assert_eq!(classify(&ctx_with_body(body)), expected);
    }

    #[test]
    fn test_dashboard_recheck_is_manual() {
        let ctx = ctx_with_headers(&[("referer", DASHBOARD_REFERER), ("if-none-match", "W/\"1a\"")]);
        assert_eq!(classify(&ctx), Trigger::Manual);
    }

    #[test]
    fn test_dashboard_referer_without_validator() {
        let ctx = ctx_with_headers(&[("referer", DASHBOARD_REFERER)]);
        assert_eq!(classify(&ctx), Trigger::Unrecognized);
    }

    #[test]
    fn test_validator_with_other_referer() {
        let ctx = ctx_with_headers(&[
            ("referer", "https://example.com/"),
            ("if-none-match", "W/\"1a\""),
        ]);
        assert_eq!(classify(&ctx), Trigger::Unrecognized);
    }

    #[test]
    fn test_empty_validator() {
        let ctx = ctx_with_headers(&[("referer", DASHBOARD_REFERER), ("if-none-match", "")]);
        assert_eq!(classify(&ctx), Trigger::Unrecognized);
    }

    #[test]
    fn test_empty_context() {
        let trigger = classify(&InvocationContext::default());
        assert_eq!(trigger, Trigger::Unrecognized);
        assert!(!trigger.should_process());
    }

    #[test]
    fn test_schedule_wins_over_headers() {
        let mut ctx = ctx_with_headers(&[("referer", DASHBOARD_REFERER), ("if-none-match", "x")]);
        ctx.body = Some(json!({"schedule": "x", "state": "active"}));
        assert_eq!(classify(&ctx), Trigger::Scheduled);
        assert!(Trigger::Manual.should_process());
    }
}
