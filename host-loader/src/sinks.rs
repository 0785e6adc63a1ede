//! Analytics sinks available on a host page.

use gloo_net::http::Request;
use js_sys::{Function, Reflect};
use perceptive_shared::analytics::{AnalyticsEvent, AnalyticsSink, SinkError};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Window;

fn to_js(value: &Value) -> Result<JsValue, SinkError> {
    js_sys::JSON::parse(&value.to_string()).map_err(|e| SinkError::Failed(format!("{e:?}")))
}

fn global_function(target: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
}

/// `window.gtag("event", name, params)`
pub struct TagManagerSink {
    window: Window,
}

impl TagManagerSink {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl AnalyticsSink for TagManagerSink {
    fn name(&self) -> &'static str {
        "gtag"
    }

    fn deliver(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let gtag = global_function(&self.window, "gtag").ok_or(SinkError::Unavailable)?;
        let params = to_js(&event.tag_manager_params())?;
        gtag.call3(
            &self.window,
            &JsValue::from_str("event"),
            &JsValue::from_str(&event.name),
            &params,
        )
        .map(|_| ())
        .map_err(|e| SinkError::Failed(format!("{e:?}")))
    }
}

/// `window.analytics.track(name, properties)`
pub struct TrackerSink {
    window: Window,
}

impl TrackerSink {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl AnalyticsSink for TrackerSink {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn deliver(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let analytics = Reflect::get(&self.window, &JsValue::from_str("analytics"))
            .ok()
            .filter(|v| v.is_object())
            .ok_or(SinkError::Unavailable)?;
        let track = global_function(&analytics, "track").ok_or(SinkError::Unavailable)?;
        let props = to_js(&event.tracker_properties())?;
        track
            .call2(&analytics, &JsValue::from_str(&event.name), &props)
            .map(|_| ())
            .map_err(|e| SinkError::Failed(format!("{e:?}")))
    }
}

/// POST to the widget server's analytics endpoint. Fire and forget: the
/// request runs on the event loop and network errors only reach the log.
pub struct HttpSink {
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl AnalyticsSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn deliver(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let request = Request::post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&event.http_body())
            .map_err(|e| SinkError::Failed(e.to_string()))?;
        let name = event.name.clone();
        spawn_local(async move {
            match request.send().await {
                Ok(resp) if !resp.ok() => {
                    tracing::debug!(event = %name, status = resp.status(), "analytics endpoint rejected event");
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(event = %name, %err, "analytics post failed"),
            }
        });
        Ok(())
    }
}
