//! Service call policy attached to a screen.
//!
//! The engine never performs service calls itself. These types describe the
//! policy a journey orchestrator applies around a `CALL_SERVICE` action: a
//! per-call timeout, a bounded fixed-delay retry schedule, the `onError`
//! routing and optional response caching.

use crate::condition::{FieldSource, Value};
use crate::data::EvaluationContext;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub on_error: OnErrorPolicy,
    /// Target of `ROUTE_TO_SCREEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts, the first call included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Waits to apply before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        std::iter::repeat_n(
            Duration::from_millis(self.delay_ms),
            self.max_retries as usize,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnErrorPolicy {
    /// Abort the journey.
    #[default]
    FailFlow,
    /// Proceed to the action's target regardless.
    Continue,
    /// Divert to `errorScreen`.
    RouteToScreen,
}

/// Where a journey goes once a service call has exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureRoute {
    AbortFlow,
    Continue(Option<String>),
    RouteTo(String),
}

impl ServiceConfig {
    pub fn new(service_id: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            retry_policy: RetryPolicy::default(),
            on_error: OnErrorPolicy::default(),
            error_screen: None,
            cache: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Applies the `onError` policy. `ROUTE_TO_SCREEN` without an error
    /// screen cannot route anywhere and aborts instead.
    pub fn on_failure(&self, target_screen: Option<&str>) -> FailureRoute {
        match self.on_error {
            OnErrorPolicy::FailFlow => FailureRoute::AbortFlow,
            OnErrorPolicy::Continue => FailureRoute::Continue(target_screen.map(str::to_string)),
            OnErrorPolicy::RouteToScreen => match self.error_screen.as_deref() {
                Some(screen) if !screen.is_empty() => FailureRoute::RouteTo(screen.to_string()),
                _ => FailureRoute::AbortFlow,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    /// e.g. `"bureau:{{formData.pan}}:{{applicationState.applicationId}}"`
    pub key_template: String,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Expands `{{section.field}}` placeholders from the context. Sections are
    /// `formData`, `applicationState`, `userProfile` and `services`
    /// (`{{services.<serviceId>.<key>}}`). Unknown or missing values render empty.
    pub fn render_key(&self, context: &EvaluationContext) -> String {
        let mut rendered = String::with_capacity(self.key_template.len());
        let mut rest = self.key_template.as_str();
        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    rendered.push_str(&lookup(context, after[..end].trim()));
                    rest = &after[end + 2..];
                }
                None => {
                    rendered.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

fn lookup(context: &EvaluationContext, path: &str) -> String {
    let Some((section, field)) = path.split_once('.') else {
        return String::new();
    };
    let source = match section {
        "formData" => FieldSource::FormData,
        "applicationState" => FieldSource::ApplicationState,
        "userProfile" => FieldSource::UserProfile,
        "services" => FieldSource::ServiceResponse,
        _ => return String::new(),
    };
    match context.resolve(source, field) {
        Value::Absent => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
