//! Best-effort analytics fan-out.
//!
//! Each sink is tried in registration order and its outcome recorded; a
//! failing or missing sink never stops the ones after it, and nothing is
//! ever returned to the caller as an error.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// What the host page looks like at the moment an event is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub widget_id: String,
    pub page_url: String,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
    pub properties: Map<String, Value>,
}

impl AnalyticsEvent {
    /// Parameters for `gtag("event", name, params)`.
    pub fn tag_manager_params(&self) -> Value {
        let mut params = Map::new();
        params.insert(
            "custom_parameter_widget_id".into(),
            Value::String(self.widget_id.clone()),
        );
        merge(&mut params, &self.properties);
        Value::Object(params)
    }

    /// Properties for `analytics.track(name, props)`.
    pub fn tracker_properties(&self) -> Value {
        let mut props = Map::new();
        props.insert("widgetId".into(), Value::String(self.widget_id.clone()));
        merge(&mut props, &self.properties);
        Value::Object(props)
    }

    /// JSON body posted to the analytics endpoint.
    pub fn http_body(&self) -> Value {
        let mut props = Map::new();
        props.insert("widgetId".into(), Value::String(self.widget_id.clone()));
        props.insert("url".into(), Value::String(self.page_url.clone()));
        props.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        merge(&mut props, &self.properties);
        serde_json::json!({ "event": self.name, "properties": props })
    }
}

/// Caller-supplied properties win over the defaults.
fn merge(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (k, v) in from {
        into.insert(k.clone(), v.clone());
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink not present on this page")]
    Unavailable,
    #[error("{0}")]
    Failed(String),
}

pub trait AnalyticsSink {
    fn name(&self) -> &'static str;

    fn deliver(&self, event: &AnalyticsEvent) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub sink: &'static str,
    pub outcome: SinkOutcome,
}

fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct AnalyticsRelay {
    widget_id: String,
    sinks: Vec<Box<dyn AnalyticsSink>>,
    clock: fn() -> String,
}

impl AnalyticsRelay {
    pub fn new(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            sinks: Vec::new(),
            clock: iso_now,
        }
    }

    pub fn with_sink(mut self, sink: impl AnalyticsSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn event(
        &self,
        name: &str,
        properties: Map<String, Value>,
        page: &PageContext,
    ) -> AnalyticsEvent {
        AnalyticsEvent {
            name: name.to_string(),
            widget_id: self.widget_id.clone(),
            page_url: page.url.clone(),
            timestamp: (self.clock)(),
            properties,
        }
    }

    pub fn track(
        &self,
        name: &str,
        properties: Map<String, Value>,
        page: &PageContext,
    ) -> Vec<SinkReport> {
        let event = self.event(name, properties, page);
        self.sinks
            .iter()
            .map(|sink| {
                let outcome = match sink.deliver(&event) {
                    Ok(()) => SinkOutcome::Delivered,
                    Err(SinkError::Unavailable) => SinkOutcome::Skipped,
                    Err(SinkError::Failed(reason)) => {
                        tracing::debug!(sink = sink.name(), event = name, %reason, "analytics sink failed");
                        SinkOutcome::Failed(reason)
                    }
                };
                SinkReport {
                    sink: sink.name(),
                    outcome,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for AnalyticsRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsRelay")
            .field("widget_id", &self.widget_id)
            .field("sinks", &self.sink_names())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every event it sees, then answers with a fixed result.
    #[derive(Clone)]
    pub struct RecordingSink {
        pub name: &'static str,
        pub result: Result<(), SinkError>,
        pub seen: Rc<RefCell<Vec<AnalyticsEvent>>>,
    }

    impl RecordingSink {
        pub fn ok(name: &'static str) -> Self {
            Self::with_result(name, Ok(()))
        }

        pub fn with_result(name: &'static str, result: Result<(), SinkError>) -> Self {
            Self {
                name,
                result,
                seen: Rc::default(),
            }
        }

        pub fn names(&self) -> Vec<String> {
            self.seen.borrow().iter().map(|e| e.name.clone()).collect()
        }
    }

    impl AnalyticsSink for RecordingSink {
        fn name(&self) -> &'static str {
            self.name
        }

        fn deliver(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
            self.seen.borrow_mut().push(event.clone());
            self.result.clone()
        }
    }

    pub fn fixed_clock() -> String {
        "2026-10-18T09:30:00.000Z".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;

    fn page() -> PageContext {
        PageContext {
            url: "https://shop.example/checkout".into(),
            user_agent: "test-agent".into(),
        }
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn every_sink_is_tried_even_after_failures() {
        let gtag = RecordingSink::with_result("gtag", Err(SinkError::Unavailable));
        let segment = RecordingSink::with_result("analytics", Err(SinkError::Failed("boom".into())));
        let http = RecordingSink::ok("http");
        let relay = AnalyticsRelay::new("acme")
            .with_clock(fixed_clock)
            .with_sink(gtag.clone())
            .with_sink(segment.clone())
            .with_sink(http.clone());

        let reports = relay.track("widget_opened", Map::new(), &page());

        assert_eq!(
            reports,
            vec![
                SinkReport { sink: "gtag", outcome: SinkOutcome::Skipped },
                SinkReport { sink: "analytics", outcome: SinkOutcome::Failed("boom".into()) },
                SinkReport { sink: "http", outcome: SinkOutcome::Delivered },
            ]
        );
        assert_eq!(http.names(), vec!["widget_opened"]);
        assert_eq!(segment.names(), vec!["widget_opened"]);
    }

    #[test]
    fn relay_without_sinks_is_a_quiet_no_op() {
        let relay = AnalyticsRelay::new("acme");
        assert!(relay.track("widget_loaded", Map::new(), &page()).is_empty());
    }

    #[test]
    fn http_body_carries_widget_id_url_and_timestamp() {
        let relay = AnalyticsRelay::new("acme").with_clock(fixed_clock);
        let event = relay.event("faq_clicked", props(json!({"question": "hours"})), &page());
        assert_eq!(
            event.http_body(),
            json!({
                "event": "faq_clicked",
                "properties": {
                    "widgetId": "acme",
                    "url": "https://shop.example/checkout",
                    "timestamp": "2026-10-18T09:30:00.000Z",
                    "question": "hours"
                }
            })
        );
    }

    #[test]
    fn caller_properties_override_defaults() {
        let relay = AnalyticsRelay::new("acme").with_clock(fixed_clock);
        let event = relay.event("x", props(json!({"widgetId": "other"})), &page());
        assert_eq!(event.tracker_properties()["widgetId"], "other");
        assert_eq!(event.http_body()["properties"]["widgetId"], "other");
    }

    #[test]
    fn tag_manager_params_use_custom_parameter_key() {
        let relay = AnalyticsRelay::new("acme").with_clock(fixed_clock);
        let event = relay.event("x", Map::new(), &page());
        assert_eq!(
            event.tag_manager_params(),
            json!({"custom_parameter_widget_id": "acme"})
        );
    }

    #[test]
    fn default_clock_is_iso_millis_utc() {
        let ts = iso_now();
        assert!(ts.ends_with('Z'), "{ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert_eq!(ts.split('.').nth(1).map(str::len), Some(4));
    }
}
