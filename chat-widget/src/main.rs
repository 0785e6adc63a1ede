mod widget;

use perceptive_shared::BridgeConfig;
use wasm_bindgen::prelude::*;

const ROOT_ID: &str = "perceptive-widget-root";
const MOUNT_RETRY_MS: i32 = 100;
const MOUNT_MAX_ATTEMPTS: u32 = 50;

fn main() {
    console_error_panic_hook::set_once();
    perceptive_shared::console::init(tracing::Level::INFO);
    leptos::logging::log!("Perceptive AI widget starting");

    if !try_mount() {
        wait_and_mount();
    }
}

fn try_mount() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    let Some(document) = window.document() else {
        return false;
    };
    let Some(root) = document.get_element_by_id(ROOT_ID) else {
        return false;
    };

    let search = window.location().search().unwrap_or_default();
    let BridgeConfig { widget_id, theme } = BridgeConfig::from_query(&search);
    tracing::info!(%widget_id, %theme, "mounting widget");

    leptos::mount::mount_to(root.unchecked_into(), move || {
        widget::Widget(widget::WidgetProps {
            widget_id: widget_id.clone(),
            theme: theme.clone(),
        })
    })
    .forget();
    true
}

fn wait_and_mount() {
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;

    let Some(window) = web_sys::window() else {
        return;
    };
    let attempts = Rc::new(Cell::new(0u32));
    let interval = Rc::new(Cell::new(None::<i32>));

    let timer = interval.clone();
    let closure: Closure<dyn FnMut()> = Closure::new(move || {
        let count = attempts.get() + 1;
        attempts.set(count);
        let done = try_mount();
        if done || count >= MOUNT_MAX_ATTEMPTS {
            if !done {
                leptos::logging::error!("#{} never appeared", ROOT_ID);
            }
            if let (Some(window), Some(id)) = (web_sys::window(), timer.take()) {
                window.clear_interval_with_handle(id);
            }
        }
    });

    match window.set_interval_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        MOUNT_RETRY_MS,
    ) {
        Ok(id) => interval.set(Some(id)),
        Err(err) => leptos::logging::error!("could not schedule mount: {:?}", err),
    }
    closure.forget();
}
