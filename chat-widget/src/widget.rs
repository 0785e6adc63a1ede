use std::time::Duration;

use leptos::ev;
use leptos::prelude::*;
use perceptive_shared::bridge::READY_DELAY_MS;
use perceptive_shared::protocol::Vocabulary;
use perceptive_shared::{BridgeConfig, ShellView, WidgetBridge, WidgetEvent, WidgetShell};
use web_sys::{MessageEvent, Window};

/// The embedding page, or `None` when this document is not framed.
fn parent_window() -> Option<Window> {
    let window = web_sys::window()?;
    let parent = window.parent().ok().flatten()?;
    if js_sys::Object::is(&parent, &window) {
        return None;
    }
    Some(parent)
}

/// Envelopes go out with target `*`: the widget cannot know which site
/// embeds it. The host checks our origin on receipt.
fn post_to_parent(event: &WidgetEvent) {
    let Some(parent) = parent_window() else {
        leptos::logging::debug_warn!("not framed, dropping {}", event.tag());
        return;
    };
    let message = match js_sys::JSON::parse(&event.to_envelope().to_string()) {
        Ok(message) => message,
        Err(err) => {
            leptos::logging::error!("could not encode {}: {:?}", event.tag(), err);
            return;
        }
    };
    if let Err(err) = parent.post_message(&message, "*") {
        leptos::logging::error!("postMessage to parent failed: {:?}", err);
    }
}

fn post_all(events: &[WidgetEvent]) {
    for event in events {
        post_to_parent(event);
    }
}

/// Parent messages only; anything else posting into this window is dropped.
fn from_parent(event: &MessageEvent) -> Option<serde_json::Value> {
    let parent = parent_window()?;
    let source = event.source()?;
    if !js_sys::Object::is(&source, &parent) {
        return None;
    }
    let text = js_sys::JSON::stringify(&event.data()).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

#[component]
pub fn Widget(widget_id: String, theme: String) -> impl IntoView {
    let session_id = uuid::Uuid::new_v4().to_string();
    let shell = RwSignal::new(WidgetShell::new(widget_id.clone(), session_id));
    let bridge = WidgetBridge::new(BridgeConfig { widget_id, theme: theme.clone() });

    // Every transition reports to the host after the local state moves.
    let run = move |transition: fn(&mut WidgetShell) -> Vec<WidgetEvent>| {
        if let Some(events) = shell.try_update(transition) {
            post_all(&events);
        }
    };

    let listener_bridge = bridge.clone();
    let handle = window_event_listener(ev::message, move |event: MessageEvent| {
        let Some(data) = from_parent(&event) else {
            return;
        };
        if let Some(action) = listener_bridge.on_parent_message(&data) {
            if let Some(events) = shell.try_update(|s| s.apply(action)) {
                post_all(&events);
            }
        }
    });
    on_cleanup(move || handle.remove());

    let ready = bridge.ready_event();
    set_timeout(
        move || post_to_parent(&ready),
        Duration::from_millis(READY_DELAY_MS.into()),
    );

    let is_open = move || shell.with(|s| s.is_open());
    let is_maximized = move || shell.with(|s| s.view() == ShellView::Maximized);

    view! {
        <div class="perceptive-widget" data-theme=theme>
            <Show
                when=is_open
                fallback=move || view! {
                    <button
                        class="perceptive-launcher"
                        aria-label="Open chat"
                        on:click=move |_| run(WidgetShell::open)
                    >
                        "💬"
                    </button>
                }
            >
                <div class="perceptive-panel" class:maximized=is_maximized>
                    <div class="perceptive-header">
                        <span>"Chat with us"</span>
                        <div>
                            <button aria-label="Minimize chat" on:click=move |_| run(WidgetShell::minimize)>
                                "–"
                            </button>
                            <button
                                aria-label=move || if is_maximized() { "Restore chat" } else { "Maximize chat" }
                                on:click=move |_| run(WidgetShell::toggle_maximize)
                            >
                                {move || if is_maximized() { "❐" } else { "□" }}
                            </button>
                            <button aria-label="Close chat" on:click=move |_| run(WidgetShell::close)>
                                "✕"
                            </button>
                        </div>
                    </div>
                    // The conversation UI mounts into this slot.
                    <div class="perceptive-body" id="perceptive-chat-slot"></div>
                </div>
            </Show>
        </div>
    }
}
