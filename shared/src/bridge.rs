//! Iframe side of the channel: configuration from the widget URL and
//! routing of parent commands.

use serde_json::Value;

use crate::config::{DEFAULT_THEME, DEFAULT_WIDGET_ID};
use crate::protocol::{HostCommand, Inbound, Vocabulary, WidgetEvent};

/// Delay before the unsolicited READY after mount. Parents that probe with
/// `PING_WIDGET` do not depend on it.
pub const READY_DELAY_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub widget_id: String,
    pub theme: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            widget_id: DEFAULT_WIDGET_ID.to_string(),
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Reads `id` and `theme` from a `location.search` string.
    pub fn from_query(search: &str) -> Self {
        let mut config = Self::default();
        let query = search.strip_prefix('?').unwrap_or(search);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "id" => config.widget_id = value.into_owned(),
                "theme" => config.theme = value.into_owned(),
                _ => {}
            }
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeAction {
    AnnounceReady,
    Open,
    Close,
    Minimize,
}

#[derive(Debug, Clone)]
pub struct WidgetBridge {
    config: BridgeConfig,
}

impl WidgetBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn ready_event(&self) -> WidgetEvent {
        WidgetEvent::ready(self.config.widget_id.clone())
    }

    pub fn on_parent_message(&self, data: &Value) -> Option<BridgeAction> {
        match HostCommand::decode(data) {
            Inbound::Known(HostCommand::Ping) => Some(BridgeAction::AnnounceReady),
            Inbound::Known(HostCommand::Open) => Some(BridgeAction::Open),
            Inbound::Known(HostCommand::Close) => Some(BridgeAction::Close),
            Inbound::Known(HostCommand::Minimize) => Some(BridgeAction::Minimize),
            Inbound::Unrecognized { type_name } => {
                tracing::debug!(type_name = ?type_name, "ignoring parent message");
                None
            }
        }
    }
}
