//! `window.PerceptiveAI`: the control surface host pages call.

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::embed::Embed;

pub const GLOBAL_NAME: &str = "PerceptiveAI";

pub fn is_installed(window: &Window) -> bool {
    Reflect::get(window, &JsValue::from_str(GLOBAL_NAME))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false)
}

/// Thin wrappers over `embed`. `init` is exposed so a page can bring the
/// widget back after `destroy`.
pub fn install(window: &Window, embed: &Embed) -> Result<(), JsValue> {
    let api = Object::new();
    let methods: [(&str, fn(&Embed)); 5] = [
        ("init", Embed::init),
        ("open", Embed::open),
        ("close", Embed::close),
        ("minimize", Embed::minimize),
        ("destroy", Embed::destroy),
    ];
    for (name, method) in methods {
        let embed = embed.clone();
        let f = Closure::<dyn Fn()>::new(move || method(&embed));
        Reflect::set(&api, &JsValue::from_str(name), f.as_ref())?;
        // Lives as long as the page.
        f.forget();
    }
    Reflect::set(window, &JsValue::from_str(GLOBAL_NAME), &api)?;
    Ok(())
}
