//! Launcher/panel state of the widget document and the events each
//! transition reports to the host page.

use serde_json::{Map, Value};

use crate::bridge::BridgeAction;
use crate::geometry::OPEN_SIZE;
use crate::protocol::WidgetEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShellView {
    #[default]
    Launcher,
    Panel,
    Maximized,
}

#[derive(Debug, Clone)]
pub struct WidgetShell {
    widget_id: String,
    session_id: String,
    view: ShellView,
    session_started: bool,
}

impl WidgetShell {
    pub fn new(widget_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            session_id: session_id.into(),
            view: ShellView::Launcher,
            session_started: false,
        }
    }

    pub fn view(&self) -> ShellView {
        self.view
    }

    pub fn is_open(&self) -> bool {
        self.view != ShellView::Launcher
    }

    pub fn open(&mut self) -> Vec<WidgetEvent> {
        if self.is_open() {
            return Vec::new();
        }
        self.view = ShellView::Panel;
        let mut events = vec![WidgetEvent::Open];
        if !self.session_started {
            self.session_started = true;
            events.push(self.track("chat_session_started", Map::new()));
        }
        if let Some((width, height)) = OPEN_SIZE.as_px() {
            events.push(WidgetEvent::resize(width, height));
        }
        events
    }

    pub fn close(&mut self) -> Vec<WidgetEvent> {
        if !self.is_open() {
            return Vec::new();
        }
        self.view = ShellView::Launcher;
        vec![WidgetEvent::Close]
    }

    pub fn minimize(&mut self) -> Vec<WidgetEvent> {
        self.view = ShellView::Launcher;
        vec![WidgetEvent::Minimize]
    }

    pub fn toggle_maximize(&mut self) -> Vec<WidgetEvent> {
        match self.view {
            ShellView::Launcher => Vec::new(),
            ShellView::Panel => {
                self.view = ShellView::Maximized;
                vec![WidgetEvent::Maximize]
            }
            ShellView::Maximized => {
                self.view = ShellView::Panel;
                vec![WidgetEvent::Restore]
            }
        }
    }

    /// Parent commands are acknowledged with the matching event so the host
    /// controller can update its presentation.
    pub fn apply(&mut self, action: BridgeAction) -> Vec<WidgetEvent> {
        match action {
            BridgeAction::AnnounceReady => vec![WidgetEvent::ready(self.widget_id.clone())],
            BridgeAction::Open => self.open(),
            BridgeAction::Close => self.close(),
            BridgeAction::Minimize => self.minimize(),
        }
    }

    /// `TRACK_EVENT` tagged with this widget and session.
    pub fn track(&self, event: &str, mut properties: Map<String, Value>) -> WidgetEvent {
        properties
            .entry("widgetId")
            .or_insert_with(|| Value::String(self.widget_id.clone()));
        properties
            .entry("sessionId")
            .or_insert_with(|| Value::String(self.session_id.clone()));
        WidgetEvent::track(event, properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(events: &[WidgetEvent]) -> Vec<&'static str> {
        events.iter().map(WidgetEvent::tag).collect()
    }

    #[test]
    fn first_open_starts_session_and_resizes() {
        let mut shell = WidgetShell::new("acme", "s-1");
        let events = shell.open();
        assert_eq!(tags(&events), vec!["WIDGET_OPEN", "TRACK_EVENT", "WIDGET_RESIZE"]);
        assert_eq!(events[2], WidgetEvent::resize(400, 600));
        match &events[1] {
            WidgetEvent::TrackEvent(t) => {
                assert_eq!(t.event, "chat_session_started");
                assert_eq!(t.properties["sessionId"], "s-1");
                assert_eq!(t.properties["widgetId"], "acme");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reopen_does_not_restart_session() {
        let mut shell = WidgetShell::new("acme", "s-1");
        shell.open();
        assert_eq!(tags(&shell.close()), vec!["WIDGET_CLOSE"]);
        assert_eq!(tags(&shell.open()), vec!["WIDGET_OPEN", "WIDGET_RESIZE"]);
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut shell = WidgetShell::new("acme", "s-1");
        assert!(shell.close().is_empty());
        shell.open();
        assert!(shell.open().is_empty());
    }

    #[test]
    fn maximize_toggles_with_restore() {
        let mut shell = WidgetShell::new("acme", "s-1");
        assert!(shell.toggle_maximize().is_empty());
        shell.open();
        assert_eq!(tags(&shell.toggle_maximize()), vec!["WIDGET_MAXIMIZE"]);
        assert_eq!(shell.view(), ShellView::Maximized);
        assert_eq!(tags(&shell.toggle_maximize()), vec!["WIDGET_RESTORE"]);
        assert_eq!(shell.view(), ShellView::Panel);
    }

    #[test]
    fn parent_commands_are_acknowledged() {
        let mut shell = WidgetShell::new("acme", "s-1");
        assert_eq!(
            shell.apply(BridgeAction::AnnounceReady),
            vec![WidgetEvent::ready("acme")]
        );
        assert_eq!(tags(&shell.apply(BridgeAction::Open))[0], "WIDGET_OPEN");
        assert_eq!(tags(&shell.apply(BridgeAction::Minimize)), vec!["WIDGET_MINIMIZE"]);
        assert!(!shell.is_open());
        assert!(shell.apply(BridgeAction::Close).is_empty());
    }

    #[test]
    fn track_keeps_caller_ids() {
        let shell = WidgetShell::new("acme", "s-1");
        let mut props = Map::new();
        props.insert("sessionId".into(), Value::String("custom".into()));
        match shell.track("rated", props) {
            WidgetEvent::TrackEvent(t) => assert_eq!(t.properties["sessionId"], "custom"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
