//! Same-origin sink for the widget's HTTP analytics relay.

use std::collections::VecDeque;
use std::sync::Mutex;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::routes::AppState;

/// Body posted by the loader: `{event, properties:{widgetId, url, timestamp, ..}}`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsBody {
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredEvent {
    pub event: String,
    pub properties: Map<String, Value>,
    pub received_at: DateTime<Utc>,
}

/// Ring of the most recent events. Oldest are dropped first.
pub struct AnalyticsStore {
    capacity: usize,
    events: Mutex<VecDeque<StoredEvent>>,
}

impl AnalyticsStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn record(&self, event: StoredEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<StoredEvent> {
        let events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.iter().cloned().collect()
    }
}

// POST /api/analytics
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<AnalyticsBody>,
) -> Result<StatusCode, ApiError> {
    let event = body.event.trim();
    if event.is_empty() {
        return Err(ApiError::BadRequest("event name is empty".into()));
    }

    let widget_id = body
        .properties
        .get("widgetId")
        .and_then(Value::as_str)
        .unwrap_or("-");
    tracing::info!(event, widget_id, "analytics event");

    state.analytics.record(StoredEvent {
        event: event.to_string(),
        properties: body.properties,
        received_at: Utc::now(),
    });
    Ok(StatusCode::ACCEPTED)
}

// GET /api/analytics/recent
pub async fn recent(State(state): State<AppState>) -> Json<Vec<StoredEvent>> {
    Json(state.analytics.recent())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str) -> StoredEvent {
        StoredEvent {
            event: name.to_string(),
            properties: Map::new(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn keeps_only_the_newest() {
        let store = AnalyticsStore::new(2);
        for name in ["a", "b", "c"] {
            store.record(stored(name));
        }
        let names: Vec<_> = store.recent().into_iter().map(|e| e.event).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let store = AnalyticsStore::new(0);
        store.record(stored("a"));
        assert!(store.recent().is_empty());
    }
}
