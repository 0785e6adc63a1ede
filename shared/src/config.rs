use std::fmt;
use std::str::FromStr;

use crate::origin::OriginCheck;

pub const DEFAULT_WIDGET_ID: &str = "default";
pub const DEFAULT_THEME: &str = "default";

/// Paths under the base URL, shared with the server that hosts them.
pub const WIDGET_PATH: &str = "/widget";
pub const ANALYTICS_PATH: &str = "/api/analytics";
pub const LOADER_PATH: &str = "/widget.js";

/// `wasm-bindgen --target no-modules` output the loader script pulls in from
/// its own directory, and the global init function that output defines.
pub const LOADER_GLUE: &str = "perceptive_loader.js";
pub const LOADER_WASM: &str = "perceptive_loader_bg.wasm";
pub const LOADER_INIT_GLOBAL: &str = "perceptiveLoaderInit";

/// Corner the container is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Position {
    BottomLeft,
    #[default]
    BottomRight,
    TopLeft,
    TopRight,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::BottomLeft,
        Position::BottomRight,
        Position::TopLeft,
        Position::TopRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
        }
    }

    /// `(vertical, horizontal)` CSS properties the container is anchored by.
    pub fn anchors(self) -> (&'static str, &'static str) {
        match self {
            Position::BottomLeft => ("bottom", "left"),
            Position::BottomRight => ("bottom", "right"),
            Position::TopLeft => ("top", "left"),
            Position::TopRight => ("top", "right"),
        }
    }
}

impl FromStr for Position {
    type Err = std::convert::Infallible;

    /// Anything unrecognised falls back to bottom-right.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "bottom-left" => Position::BottomLeft,
            "top-left" => Position::TopLeft,
            "top-right" => Position::TopRight,
            _ => Position::BottomRight,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loader configuration, read once from the embedding `<script>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub widget_id: String,
    pub base_url: String,
    pub theme: String,
    pub position: Position,
    pub origin_check: OriginCheck,
}

impl WidgetConfig {
    /// `src` is the script's resolved URL, `attr` looks up `data-*`
    /// attributes on the same tag. Empty attributes count as absent.
    pub fn from_script(src: &str, attr: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| attr(name).filter(|v| !v.trim().is_empty());

        let base_url = read("data-base-url")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url_from_src(src));

        Self {
            widget_id: read("data-id").unwrap_or_else(|| DEFAULT_WIDGET_ID.to_string()),
            base_url,
            theme: read("data-theme").unwrap_or_else(|| DEFAULT_THEME.to_string()),
            position: read("data-position")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            origin_check: read("data-origin-check")
                .and_then(|c| c.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// `<baseUrl>/widget?id=<widgetId>&theme=<theme>`
    pub fn iframe_src(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id", &self.widget_id)
            .append_pair("theme", &self.theme)
            .finish();
        format!("{}{}?{}", self.base_url, WIDGET_PATH, query)
    }

    pub fn analytics_endpoint(&self) -> String {
        format!("{}{}", self.base_url, ANALYTICS_PATH)
    }

    /// Origin the iframe document is loaded from, used as the postMessage
    /// target. `None` when the base URL has no usable origin.
    pub fn frame_origin(&self) -> Option<String> {
        let url = url::Url::parse(&self.base_url).ok()?;
        let origin = url.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

/// Drops query, fragment and the trailing `*.js` segment.
fn base_url_from_src(src: &str) -> String {
    let without_query = src.split(['?', '#']).next().unwrap_or_default();
    match without_query.rsplit_once('/') {
        Some((dir, file)) if file.ends_with(".js") => dir.to_string(),
        _ => without_query.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn attrs(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_attributes_missing() {
        let cfg = WidgetConfig::from_script("https://chat.example.com/widget.js", attrs(&[]));
        assert_eq!(cfg.widget_id, "default");
        assert_eq!(cfg.theme, "default");
        assert_eq!(cfg.position, Position::BottomRight);
        assert_eq!(cfg.base_url, "https://chat.example.com");
        assert_eq!(cfg.origin_check, OriginCheck::Strict);
    }

    #[test]
    fn reads_data_attributes() {
        let cfg = WidgetConfig::from_script(
            "https://chat.example.com/static/widget.js?v=3",
            attrs(&[
                ("data-id", "DC-HBX"),
                ("data-theme", "dark"),
                ("data-position", "top-left"),
                ("data-origin-check", "legacy"),
            ]),
        );
        assert_eq!(cfg.widget_id, "DC-HBX");
        assert_eq!(cfg.theme, "dark");
        assert_eq!(cfg.position, Position::TopLeft);
        assert_eq!(cfg.base_url, "https://chat.example.com/static");
        assert_eq!(cfg.origin_check, OriginCheck::Legacy);
    }

    #[test]
    fn empty_attribute_counts_as_missing() {
        let cfg = WidgetConfig::from_script("https://a.io/widget.js", attrs(&[("data-id", "  ")]));
        assert_eq!(cfg.widget_id, "default");
    }

    #[test]
    fn base_url_override_wins() {
        let cfg = WidgetConfig::from_script(
            "https://cdn.example.net/widget.js",
            attrs(&[("data-base-url", "https://chat.example.com/")]),
        );
        assert_eq!(cfg.base_url, "https://chat.example.com");
        assert_eq!(cfg.analytics_endpoint(), "https://chat.example.com/api/analytics");
    }

    #[test]
    fn frame_origin_keeps_written_scheme() {
        let cfg = WidgetConfig::from_script("http://localhost:3000/widget.js", attrs(&[]));
        assert_eq!(cfg.frame_origin().as_deref(), Some("http://localhost:3000"));
        let cfg = WidgetConfig::from_script("widget.js", attrs(&[]));
        assert_eq!(cfg.frame_origin(), None);
    }

    #[test]
    fn unknown_position_falls_back_to_bottom_right() {
        assert_eq!("middle".parse::<Position>(), Ok(Position::BottomRight));
        for p in Position::ALL {
            assert_eq!(p.as_str().parse::<Position>(), Ok(p));
        }
    }

    #[test]
    fn iframe_src_encodes_query() {
        let cfg = WidgetConfig::from_script(
            "https://chat.example.com/widget.js",
            attrs(&[("data-id", "acme corp"), ("data-theme", "dark&bold")]),
        );
        assert_eq!(
            cfg.iframe_src(),
            "https://chat.example.com/widget?id=acme+corp&theme=dark%26bold"
        );
    }
}
