//! Host-side controller: owns the container/iframe pair on the embedding
//! page and turns acknowledged widget events into geometry and analytics.
//!
//! Commands (`open`, `close`, `minimize`) only post into the iframe.
//! Presentation state changes when the widget answers with the matching
//! `WIDGET_*` event, never on send.

use serde_json::{Map, Value};

use crate::analytics::{AnalyticsRelay, PageContext, SinkReport};
use crate::config::WidgetConfig;
use crate::geometry::{self, OpenState, MINIMIZED_SIZE};
use crate::origin::{OriginCheck, OriginPolicy};
use crate::protocol::{HostCommand, Inbound, Vocabulary, WidgetEvent};
use crate::WidgetError;

pub const CONTAINER_ID: &str = "perceptive-ai-widget-container";
pub const IFRAME_ID: &str = "perceptive-ai-widget-iframe";
pub const IFRAME_SANDBOX: &str =
    "allow-scripts allow-same-origin allow-forms allow-popups allow-popups-to-escape-sandbox";
pub const IFRAME_ALLOW: &str = "clipboard-write; web-share";
pub const IFRAME_TITLE: &str = "Perceptive AI Chat Widget";

pub const HANDSHAKE_INTERVAL_MS: u32 = 500;
pub const HANDSHAKE_MAX_ATTEMPTS: u32 = 10;

/// Everything needed to build the container and iframe elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub container_id: &'static str,
    pub container_css: String,
    pub iframe_id: &'static str,
    pub iframe_src: String,
    pub iframe_css: &'static str,
    pub sandbox: &'static str,
    pub allow: &'static str,
    pub title: &'static str,
}

/// The part of the host page the controller drives.
pub trait EmbedSurface {
    /// Build the container + iframe and attach them to the document.
    fn mount(&mut self, spec: &MountSpec) -> Result<(), WidgetError>;

    /// Detach the container if attached and drop element references.
    fn unmount(&mut self);

    fn apply_container_style(&mut self, css: &str);

    /// Inline width/height override in px, on top of the current style.
    fn override_container_size(&mut self, width: Option<u32>, height: Option<u32>);

    fn post_command(&self, command: &HostCommand);

    fn page_context(&self) -> PageContext;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Mounted { analytics: Vec<SinkReport> },
    AlreadyLoaded,
    Failed(String),
}

/// What handling one inbound message did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Wire tag of a recognised event.
    pub event: Option<&'static str>,
    pub trusted: bool,
    /// New presentation state, when the message moved it.
    pub presence: Option<OpenState>,
    /// Whether the named action ran (false for rejected origins).
    pub dispatched: bool,
    pub analytics: Vec<SinkReport>,
}

pub struct HostController<S: EmbedSurface> {
    config: WidgetConfig,
    policy: OriginPolicy,
    surface: S,
    relay: AnalyticsRelay,
    loaded: bool,
    open: OpenState,
    ready: bool,
    ping_attempts: u32,
}

impl<S: EmbedSurface> HostController<S> {
    pub fn new(config: WidgetConfig, surface: S, relay: AnalyticsRelay) -> Result<Self, WidgetError> {
        let policy = OriginPolicy::for_base_url(&config.base_url)?;
        Ok(Self::with_policy(config, policy, surface, relay))
    }

    pub fn with_policy(
        config: WidgetConfig,
        policy: OriginPolicy,
        surface: S,
        relay: AnalyticsRelay,
    ) -> Self {
        Self {
            config,
            policy,
            surface,
            relay,
            loaded: false,
            open: OpenState::Closed,
            ready: false,
            ping_attempts: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn open_state(&self) -> OpenState {
        self.open
    }

    /// The iframe has answered the handshake.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn mount_spec(&self) -> MountSpec {
        MountSpec {
            container_id: CONTAINER_ID,
            container_css: geometry::container_styles(self.open, self.config.position),
            iframe_id: IFRAME_ID,
            iframe_src: self.config.iframe_src(),
            iframe_css: geometry::iframe_styles(),
            sandbox: IFRAME_SANDBOX,
            allow: IFRAME_ALLOW,
            title: IFRAME_TITLE,
        }
    }

    /// Mount the widget. A second call while loaded does nothing.
    pub fn init(&mut self) -> InitOutcome {
        if self.loaded {
            return InitOutcome::AlreadyLoaded;
        }
        self.open = OpenState::Closed;
        self.ready = false;
        self.ping_attempts = 0;

        let spec = self.mount_spec();
        if let Err(err) = self.surface.mount(&spec) {
            tracing::error!(%err, "Perceptive AI Widget: failed to initialize");
            self.surface.unmount();
            return InitOutcome::Failed(err.to_string());
        }
        self.loaded = true;
        tracing::info!(widget_id = %self.config.widget_id, "widget mounted");

        let page = self.surface.page_context();
        let mut props = Map::new();
        props.insert("widgetId".into(), Value::String(self.config.widget_id.clone()));
        props.insert("url".into(), Value::String(page.url.clone()));
        props.insert("userAgent".into(), Value::String(page.user_agent.clone()));
        let analytics = self.relay.track("widget_loaded", props, &page);
        InitOutcome::Mounted { analytics }
    }

    pub fn open(&self) -> bool {
        self.send(HostCommand::Open)
    }

    pub fn close(&self) -> bool {
        self.send(HostCommand::Close)
    }

    pub fn minimize(&self) -> bool {
        self.send(HostCommand::Minimize)
    }

    fn send(&self, command: HostCommand) -> bool {
        if !self.loaded {
            tracing::debug!(?command, "widget not loaded, command dropped");
            return false;
        }
        self.surface.post_command(&command);
        true
    }

    /// Remove the widget from the page. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.loaded {
            tracing::info!(widget_id = %self.config.widget_id, "widget destroyed");
        }
        self.surface.unmount();
        self.loaded = false;
        self.ready = false;
    }

    /// The iframe document finished loading; probe it for readiness.
    pub fn on_frame_load(&mut self) {
        if self.loaded && !self.ready {
            self.surface.post_command(&HostCommand::Ping);
        }
    }

    /// One step of the readiness probe. Returns whether another step should
    /// be scheduled after [`HANDSHAKE_INTERVAL_MS`].
    pub fn handshake_tick(&mut self) -> bool {
        if !self.loaded || self.ready {
            return false;
        }
        if self.ping_attempts >= HANDSHAKE_MAX_ATTEMPTS {
            tracing::warn!(attempts = self.ping_attempts, "widget iframe never reported ready");
            return false;
        }
        self.ping_attempts += 1;
        self.surface.post_command(&HostCommand::Ping);
        true
    }

    /// Handle one `message` event from `origin` carrying `data`.
    pub fn handle_message(&mut self, origin: &str, data: &Value) -> Dispatch {
        let mut outcome = Dispatch::default();
        if !self.loaded {
            return outcome;
        }

        let inbound = WidgetEvent::decode(data);
        outcome.event = inbound.known().map(WidgetEvent::tag);
        outcome.trusted = self.policy.is_trusted(origin);

        let presence = match self.config.origin_check {
            OriginCheck::Legacy => Some(legacy_presence(&inbound)),
            OriginCheck::Strict if outcome.trusted => inbound.known().and_then(presence_of),
            OriginCheck::Strict => None,
        };
        if let Some(state) = presence {
            self.set_open_state(state);
            outcome.presence = Some(state);
        }

        if !outcome.trusted {
            tracing::debug!(origin, "message from untrusted origin dropped");
            return outcome;
        }
        outcome.dispatched = true;

        let page = self.surface.page_context();
        match inbound {
            Inbound::Known(WidgetEvent::Ready(data)) => {
                self.ready = true;
                tracing::info!(widget_id = %data.widget_id, "Perceptive AI Widget: ready");
            }
            Inbound::Known(WidgetEvent::Resize(size)) => {
                if size.width.is_some() || size.height.is_some() {
                    self.surface.override_container_size(size.width, size.height);
                }
            }
            Inbound::Known(WidgetEvent::Close) => {
                outcome.analytics = self.relay.track("widget_closed", Map::new(), &page);
            }
            Inbound::Known(WidgetEvent::Open) => {
                outcome.analytics = self.relay.track("widget_opened", Map::new(), &page);
            }
            Inbound::Known(WidgetEvent::Minimize) => {
                if let Some((width, height)) = MINIMIZED_SIZE.as_px() {
                    self.surface.override_container_size(Some(width), Some(height));
                }
                outcome.analytics = self.relay.track("widget_minimized", Map::new(), &page);
            }
            Inbound::Known(WidgetEvent::Maximize) | Inbound::Known(WidgetEvent::Restore) => {}
            Inbound::Known(WidgetEvent::TrackEvent(track)) => {
                outcome.analytics = self.relay.track(&track.event, track.properties, &page);
            }
            Inbound::Unrecognized { type_name } => {
                tracing::warn!(type_name = ?type_name, "unknown message type");
            }
        }
        outcome
    }

    fn set_open_state(&mut self, state: OpenState) {
        self.open = state;
        let css = geometry::container_styles(state, self.config.position);
        self.surface.apply_container_style(&css);
    }
}

/// Presence implied by a recognised event, if any.
fn presence_of(event: &WidgetEvent) -> Option<OpenState> {
    match event {
        WidgetEvent::Open | WidgetEvent::Resize(_) | WidgetEvent::Restore => Some(OpenState::Open),
        WidgetEvent::Maximize => Some(OpenState::Maximized),
        WidgetEvent::Close | WidgetEvent::Minimize => Some(OpenState::Closed),
        WidgetEvent::Ready(_) | WidgetEvent::TrackEvent(_) => None,
    }
}

/// Every message moves presence; anything not open-like reads as closed.
fn legacy_presence(inbound: &Inbound<WidgetEvent>) -> OpenState {
    match inbound {
        Inbound::Known(WidgetEvent::Open | WidgetEvent::Resize(_) | WidgetEvent::Restore) => {
            OpenState::Open
        }
        Inbound::Known(WidgetEvent::Maximize) => OpenState::Maximized,
        _ => OpenState::Closed,
    }
}
