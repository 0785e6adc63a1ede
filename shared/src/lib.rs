//! Core of the Perceptive AI embed: everything both sides of the iframe
//! boundary agree on, plus the host-side state machine.
//!
//! Nothing in here touches the DOM. The wasm crates bind these types to
//! `web-sys`; tests drive them through fakes.

pub mod analytics;
pub mod bridge;
pub mod config;
pub mod console;
pub mod controller;
pub mod geometry;
pub mod origin;
pub mod protocol;
pub mod shell;

pub use analytics::{AnalyticsEvent, AnalyticsRelay, AnalyticsSink, PageContext, SinkOutcome};
pub use bridge::{BridgeAction, BridgeConfig, WidgetBridge};
pub use config::{Position, WidgetConfig};
pub use controller::{Dispatch, EmbedSurface, HostController, InitOutcome};
pub use geometry::OpenState;
pub use origin::{OriginCheck, OriginPolicy};
pub use protocol::{HostCommand, Inbound, WidgetEvent};
pub use shell::{ShellView, WidgetShell};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("failed to build widget DOM: {0}")]
    Mount(String),

    #[error("invalid base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
