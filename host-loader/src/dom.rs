use perceptive_shared::analytics::PageContext;
use perceptive_shared::controller::{EmbedSurface, MountSpec};
use perceptive_shared::protocol::{HostCommand, Vocabulary};
use perceptive_shared::WidgetError;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlIFrameElement, Window};

/// The real container/iframe pair on the host page.
pub struct DomSurface {
    window: Window,
    document: Document,
    /// postMessage target; `"*"` when the frame origin is unknown.
    target_origin: String,
    container: Option<HtmlElement>,
    iframe: Option<HtmlIFrameElement>,
}

fn mount_err(context: &str, err: JsValue) -> WidgetError {
    WidgetError::Mount(format!("{context}: {err:?}"))
}

impl DomSurface {
    pub fn new(window: Window, document: Document, target_origin: Option<String>) -> Self {
        Self {
            window,
            document,
            target_origin: target_origin.unwrap_or_else(|| "*".to_string()),
            container: None,
            iframe: None,
        }
    }

    pub fn iframe(&self) -> Option<&HtmlIFrameElement> {
        self.iframe.as_ref()
    }

    fn build(&self, spec: &MountSpec) -> Result<(HtmlElement, HtmlIFrameElement), WidgetError> {
        let container: HtmlElement = self
            .document
            .create_element("div")
            .map_err(|e| mount_err("create container", e))?
            .dyn_into()
            .map_err(|_| WidgetError::Mount("container is not an HtmlElement".into()))?;
        container.set_id(spec.container_id);
        container.style().set_css_text(&spec.container_css);

        let iframe: HtmlIFrameElement = self
            .document
            .create_element("iframe")
            .map_err(|e| mount_err("create iframe", e))?
            .dyn_into()
            .map_err(|_| WidgetError::Mount("iframe is not an HtmlIFrameElement".into()))?;
        iframe.set_id(spec.iframe_id);
        iframe.set_src(&spec.iframe_src);
        iframe.style().set_css_text(spec.iframe_css);
        for (name, value) in [
            ("sandbox", spec.sandbox),
            ("allow", spec.allow),
            ("loading", "lazy"),
            ("title", spec.title),
        ] {
            iframe
                .set_attribute(name, value)
                .map_err(|e| mount_err(name, e))?;
        }

        container
            .append_child(&iframe)
            .map_err(|e| mount_err("append iframe", e))?;
        Ok((container, iframe))
    }
}

impl EmbedSurface for DomSurface {
    fn mount(&mut self, spec: &MountSpec) -> Result<(), WidgetError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| WidgetError::Mount("document has no body".into()))?;
        let (container, iframe) = self.build(spec)?;
        body.append_child(&container)
            .map_err(|e| mount_err("append container", e))?;
        self.container = Some(container);
        self.iframe = Some(iframe);
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(container) = self.container.take() {
            container.remove();
        }
        self.iframe = None;
    }

    fn apply_container_style(&mut self, css: &str) {
        if let Some(container) = &self.container {
            container.style().set_css_text(css);
        }
    }

    fn override_container_size(&mut self, width: Option<u32>, height: Option<u32>) {
        let Some(container) = &self.container else {
            return;
        };
        let style = container.style();
        for (prop, value) in [("width", width), ("height", height)] {
            if let Some(px) = value {
                if let Err(err) = style.set_property_with_priority(prop, &format!("{px}px"), "important") {
                    tracing::warn!(prop, ?err, "failed to resize widget container");
                }
            }
        }
    }

    fn post_command(&self, command: &HostCommand) {
        let Some(frame) = self.iframe.as_ref().and_then(|f| f.content_window()) else {
            return;
        };
        let message = match js_sys::JSON::parse(&command.to_envelope().to_string()) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(?err, "failed to encode command");
                return;
            }
        };
        if let Err(err) = frame.post_message(&message, &self.target_origin) {
            tracing::warn!(?command, ?err, "postMessage to widget failed");
        }
    }

    fn page_context(&self) -> PageContext {
        PageContext {
            url: self.window.location().href().unwrap_or_default(),
            user_agent: self.window.navigator().user_agent().unwrap_or_default(),
        }
    }
}
