//! Owned embed handle: one controller per page, the listeners it needs, and
//! the readiness probe loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use perceptive_shared::analytics::AnalyticsRelay;
use perceptive_shared::controller::{HostController, InitOutcome, HANDSHAKE_INTERVAL_MS};
use perceptive_shared::WidgetConfig;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{AddEventListenerOptions, Document, Event, MessageEvent, Window};

use crate::dom::DomSurface;
use crate::sinks::{HttpSink, TagManagerSink, TrackerSink};

type Controller = HostController<DomSurface>;

#[derive(Default)]
struct Listeners {
    message: Option<Closure<dyn FnMut(MessageEvent)>>,
    frame_load: Option<Closure<dyn FnMut(Event)>>,
}

#[derive(Clone)]
pub struct Embed {
    window: Window,
    document: Document,
    controller: Rc<RefCell<Controller>>,
    listeners: Rc<RefCell<Listeners>>,
    /// Bumped on every mount/destroy so stale probe loops stop.
    generation: Rc<Cell<u32>>,
}

/// `event.data` as JSON; anything that does not survive `JSON.stringify`
/// becomes `null`.
fn message_data(event: &MessageEvent) -> Value {
    js_sys::JSON::stringify(&event.data())
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

impl Embed {
    pub fn new(window: Window, document: Document, config: WidgetConfig) -> Result<Self, JsValue> {
        let relay = AnalyticsRelay::new(config.widget_id.clone())
            .with_sink(TagManagerSink::new(window.clone()))
            .with_sink(TrackerSink::new(window.clone()))
            .with_sink(HttpSink::new(config.analytics_endpoint()));
        let surface = DomSurface::new(window.clone(), document.clone(), config.frame_origin());
        let controller = HostController::new(config, surface, relay)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self {
            window,
            document,
            controller: Rc::new(RefCell::new(controller)),
            listeners: Rc::default(),
            generation: Rc::default(),
        })
    }

    fn with_controller<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> Option<R> {
        match self.controller.try_borrow_mut() {
            Ok(mut ctl) => Some(f(&mut ctl)),
            Err(_) => {
                tracing::warn!("widget controller busy, call dropped");
                None
            }
        }
    }

    /// Mount once the document has a body. Repeated calls are no-ops.
    pub fn init(&self) {
        if self.document.ready_state() != "loading" {
            self.mount_now();
            return;
        }
        let this = self.clone();
        let on_ready = Closure::once_into_js(move |_: Event| this.mount_now());
        let opts = AddEventListenerOptions::new();
        opts.set_once(true);
        if let Err(err) = self
            .document
            .add_event_listener_with_callback_and_add_event_listener_options(
                "DOMContentLoaded",
                on_ready.unchecked_ref(),
                &opts,
            )
        {
            tracing::error!(?err, "could not wait for DOMContentLoaded");
        }
    }

    fn mount_now(&self) {
        let Some(outcome) = self.with_controller(|ctl| ctl.init()) else {
            return;
        };
        match outcome {
            InitOutcome::Mounted { .. } => {
                self.generation.set(self.generation.get().wrapping_add(1));
                self.attach_listeners();
                self.start_handshake();
            }
            InitOutcome::AlreadyLoaded => {}
            InitOutcome::Failed(reason) => {
                tracing::error!(%reason, "Perceptive AI Widget: failed to initialize");
            }
        }
    }

    fn attach_listeners(&self) {
        let mut listeners = self.listeners.borrow_mut();

        if listeners.message.is_none() {
            let this = self.clone();
            let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let origin = event.origin();
                let data = message_data(&event);
                if let Some(out) = this.with_controller(|ctl| ctl.handle_message(&origin, &data)) {
                    tracing::debug!(origin = %origin, event = ?out.event, dispatched = out.dispatched, "message handled");
                }
            });
            if let Err(err) = self
                .window
                .add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())
            {
                tracing::error!(?err, "could not listen for widget messages");
            }
            listeners.message = Some(on_message);
        }

        let this = self.clone();
        let on_load = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            this.with_controller(|ctl| ctl.on_frame_load());
        });
        if let Some(iframe) = self.controller.borrow().surface().iframe() {
            if let Err(err) =
                iframe.add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())
            {
                tracing::warn!(?err, "could not observe widget iframe load");
            }
        }
        listeners.frame_load = Some(on_load);
    }

    fn start_handshake(&self) {
        let this = self.clone();
        let generation = self.generation.get();
        spawn_local(async move {
            loop {
                TimeoutFuture::new(HANDSHAKE_INTERVAL_MS).await;
                if this.generation.get() != generation {
                    break;
                }
                // Busy controller: try again next interval.
                if !this.with_controller(|ctl| ctl.handshake_tick()).unwrap_or(true) {
                    break;
                }
            }
        });
    }

    pub fn open(&self) {
        self.with_controller(|ctl| ctl.open());
    }

    pub fn close(&self) {
        self.with_controller(|ctl| ctl.close());
    }

    pub fn minimize(&self) {
        self.with_controller(|ctl| ctl.minimize());
    }

    /// Remove the widget and its listeners. Safe to call repeatedly.
    pub fn destroy(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        let mut listeners = self.listeners.borrow_mut();
        if let Some(on_message) = listeners.message.take() {
            if let Err(err) = self
                .window
                .remove_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())
            {
                tracing::debug!(?err, "could not remove widget message listener");
            }
        }
        listeners.frame_load = None;
        drop(listeners);
        self.with_controller(|ctl| ctl.destroy());
    }
}
