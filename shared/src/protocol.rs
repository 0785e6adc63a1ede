//! postMessage vocabulary shared by the host loader and the widget iframe.
//!
//! Every envelope is `{ type, data? }`. Encoding goes through serde's
//! adjacent tagging; decoding is done by hand so that unknown tags and
//! foreign payloads never become errors, only [`Inbound::Unrecognized`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parent → iframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum HostCommand {
    #[serde(rename = "OPEN_WIDGET")]
    Open,
    #[serde(rename = "CLOSE_WIDGET")]
    Close,
    #[serde(rename = "MINIMIZE_WIDGET")]
    Minimize,
    /// Handshake probe; the iframe answers with `WIDGET_READY`.
    #[serde(rename = "PING_WIDGET")]
    Ping,
}

/// Iframe → parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WidgetEvent {
    #[serde(rename = "WIDGET_READY")]
    Ready(ReadyData),
    #[serde(rename = "WIDGET_OPEN")]
    Open,
    #[serde(rename = "WIDGET_CLOSE")]
    Close,
    #[serde(rename = "WIDGET_MINIMIZE")]
    Minimize,
    #[serde(rename = "WIDGET_MAXIMIZE")]
    Maximize,
    #[serde(rename = "WIDGET_RESTORE")]
    Restore,
    #[serde(rename = "WIDGET_RESIZE")]
    Resize(ResizeData),
    #[serde(rename = "TRACK_EVENT")]
    TrackEvent(TrackData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyData {
    pub widget_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResizeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ResizeData {
    /// Never fails: a resize is still an "open" signal when its payload is
    /// off. Fractions round to whole pixels; zero, negative and non-numeric
    /// sides are absent.
    pub fn from_data(data: &Value) -> Self {
        let side = |name: &str| {
            data.get(name)
                .and_then(Value::as_f64)
                .map(f64::round)
                .filter(|px| px.is_finite() && *px >= 1.0)
                .map(|px| px.min(f64::from(u32::MAX)) as u32)
        };
        Self {
            width: side("width"),
            height: side("height"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub event: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

/// `properties: null` forwards like a missing field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of decoding whatever arrived on a `message` event.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<T> {
    Known(T),
    /// `type_name` is `None` when the payload was not an envelope at all
    /// (other scripts on the page post strings, arrays, ...).
    Unrecognized { type_name: Option<String> },
}

impl<T> Inbound<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Inbound::Known(msg) => Some(msg),
            Inbound::Unrecognized { .. } => None,
        }
    }
}

/// A closed set of envelope tags with a payload shape per tag.
pub trait Vocabulary: Sized {
    /// `Ok(None)` for a tag outside the vocabulary.
    fn from_parts(tag: &str, data: Value) -> Result<Option<Self>, serde_json::Error>;

    fn to_envelope(&self) -> Value;

    fn decode(value: &Value) -> Inbound<Self> {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Inbound::Unrecognized { type_name: None };
        };
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        match Self::from_parts(tag, data) {
            Ok(Some(msg)) => Inbound::Known(msg),
            Ok(None) => Inbound::Unrecognized {
                type_name: Some(tag.to_string()),
            },
            Err(err) => {
                tracing::warn!(tag, %err, "malformed payload for message type");
                Inbound::Unrecognized {
                    type_name: Some(tag.to_string()),
                }
            }
        }
    }
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(data)
}

impl Vocabulary for HostCommand {
    fn from_parts(tag: &str, _data: Value) -> Result<Option<Self>, serde_json::Error> {
        Ok(match tag {
            "OPEN_WIDGET" => Some(HostCommand::Open),
            "CLOSE_WIDGET" => Some(HostCommand::Close),
            "MINIMIZE_WIDGET" => Some(HostCommand::Minimize),
            "PING_WIDGET" => Some(HostCommand::Ping),
            _ => None,
        })
    }

    fn to_envelope(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Vocabulary for WidgetEvent {
    fn from_parts(tag: &str, data: Value) -> Result<Option<Self>, serde_json::Error> {
        let event = match tag {
            "WIDGET_READY" => WidgetEvent::Ready(payload(data)?),
            "WIDGET_OPEN" => WidgetEvent::Open,
            "WIDGET_CLOSE" => WidgetEvent::Close,
            "WIDGET_MINIMIZE" => WidgetEvent::Minimize,
            "WIDGET_MAXIMIZE" => WidgetEvent::Maximize,
            "WIDGET_RESTORE" => WidgetEvent::Restore,
            "WIDGET_RESIZE" => WidgetEvent::Resize(ResizeData::from_data(&data)),
            "TRACK_EVENT" => WidgetEvent::TrackEvent(payload(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    fn to_envelope(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl WidgetEvent {
    pub fn ready(widget_id: impl Into<String>) -> Self {
        WidgetEvent::Ready(ReadyData {
            widget_id: widget_id.into(),
        })
    }

    pub fn resize(width: u32, height: u32) -> Self {
        WidgetEvent::Resize(ResizeData {
            width: Some(width),
            height: Some(height),
        })
    }

    pub fn track(event: impl Into<String>, properties: Map<String, Value>) -> Self {
        WidgetEvent::TrackEvent(TrackData {
            event: event.into(),
            properties,
        })
    }

    /// Wire tag, used for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            WidgetEvent::Ready(_) => "WIDGET_READY",
            WidgetEvent::Open => "WIDGET_OPEN",
            WidgetEvent::Close => "WIDGET_CLOSE",
            WidgetEvent::Minimize => "WIDGET_MINIMIZE",
            WidgetEvent::Maximize => "WIDGET_MAXIMIZE",
            WidgetEvent::Restore => "WIDGET_RESTORE",
            WidgetEvent::Resize(_) => "WIDGET_RESIZE",
            WidgetEvent::TrackEvent(_) => "TRACK_EVENT",
        }
    }
}
