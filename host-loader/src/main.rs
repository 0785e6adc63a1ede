mod api;
mod dom;
mod embed;
mod sinks;

use perceptive_shared::WidgetConfig;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlScriptElement};

fn main() {
    console_error_panic_hook::set_once();
    perceptive_shared::console::init(tracing::Level::INFO);

    if let Err(err) = bootstrap() {
        // Never surface loader failures to the host page.
        tracing::error!(?err, "Perceptive AI Widget: failed to load");
    }
}

/// The tag that loaded us. By the time wasm runs `currentScript` is usually
/// gone, so fall back to a marker attribute, then to the script URL.
fn loader_script(document: &Document) -> Option<HtmlScriptElement> {
    document
        .current_script()
        .or_else(|| {
            ["script[data-perceptive-widget]", "script[src*=\"widget.js\"]"]
                .iter()
                .find_map(|selector| document.query_selector(selector).ok().flatten())
        })
        .and_then(|el| el.dyn_into::<HtmlScriptElement>().ok())
}

fn bootstrap() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    if api::is_installed(&window) {
        tracing::debug!("widget already present on this page");
        return Ok(());
    }

    let script = loader_script(&document).ok_or("loader script tag not found")?;
    let config = WidgetConfig::from_script(&script.src(), |name| script.get_attribute(name));
    tracing::info!(widget_id = %config.widget_id, base_url = %config.base_url, "loading widget");

    let embed = embed::Embed::new(window.clone(), document, config)?;
    api::install(&window, &embed)?;
    embed.init();
    Ok(())
}
