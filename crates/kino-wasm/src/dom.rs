//! Browser DOM adapters
//!
//! Implements the player's [`Document`]/[`Element`] traits over `web-sys`.
//! Fullscreen calls go through `Reflect` so vendor-prefixed variants are
//! found on older engines.

use js_sys::{Function, Reflect};
use kino_player::dom::{Document, Element, ElementRef};
use kino_player::{Error, Result};
use std::any::Any;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlElement;

const REQUEST_FULLSCREEN: [&str; 5] = [
    "requestFullscreen",
    "webkitRequestFullscreen",
    "mozRequestFullScreen",
    "msRequestFullscreen",
    // iOS Safari only exposes fullscreen on <video>
    "webkitEnterFullscreen",
];

const EXIT_FULLSCREEN: [&str; 4] = [
    "exitFullscreen",
    "webkitExitFullscreen",
    "mozCancelFullScreen",
    "msExitFullscreen",
];

const FULLSCREEN_ELEMENT: [&str; 4] = [
    "fullscreenElement",
    "webkitFullscreenElement",
    "mozFullScreenElement",
    "msFullscreenElement",
];

pub(crate) fn js_error(context: &str, err: JsValue) -> Error {
    let detail = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    Error::dom(format!("{context}: {detail}"))
}

/// Call the first method in `names` that `target` implements
fn call_first(target: &JsValue, names: &[&str]) -> Result<()> {
    for name in names {
        let method = Reflect::get(target, &JsValue::from_str(name))
            .map_err(|e| js_error(name, e))?;
        if let Some(function) = method.dyn_ref::<Function>() {
            function.call0(target).map_err(|e| js_error(name, e))?;
            return Ok(());
        }
    }
    Err(Error::Fullscreen(format!("none of {} is supported", names.join(", "))))
}

/// `HTMLElement` handle
#[derive(Debug, Clone)]
pub struct WebElement(HtmlElement);

impl WebElement {
    pub fn new(element: HtmlElement) -> Self {
        Self(element)
    }

    pub fn inner(&self) -> &HtmlElement {
        &self.0
    }

    /// Recover the browser node behind a player element
    pub fn unwrap_ref(element: &ElementRef) -> Result<&HtmlElement> {
        element
            .as_any()
            .downcast_ref::<WebElement>()
            .map(WebElement::inner)
            .ok_or_else(|| Error::dom("element does not belong to this document"))
    }
}

impl Element for WebElement {
    fn tag_name(&self) -> String {
        self.0.tag_name().to_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.0
            .set_attribute(name, value)
            .map_err(|e| js_error("setAttribute", e))
    }

    fn remove_attribute(&self, name: &str) -> Result<()> {
        self.0
            .remove_attribute(name)
            .map_err(|e| js_error("removeAttribute", e))
    }

    fn style_property(&self, name: &str) -> Option<String> {
        self.0
            .style()
            .get_property_value(name)
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn set_style_property(&self, name: &str, value: &str) -> Result<()> {
        self.0
            .style()
            .set_property(name, value)
            .map_err(|e| js_error("style.setProperty", e))
    }

    fn remove_style_property(&self, name: &str) -> Result<()> {
        self.0
            .style()
            .remove_property(name)
            .map(|_| ())
            .map_err(|e| js_error("style.removeProperty", e))
    }

    fn append_child(&self, child: &ElementRef) -> Result<()> {
        let child = WebElement::unwrap_ref(child)?;
        self.0
            .append_child(child)
            .map(|_| ())
            .map_err(|e| js_error("appendChild", e))
    }

    fn remove_child(&self, child: &ElementRef) -> Result<()> {
        let child = WebElement::unwrap_ref(child)?;
        self.0
            .remove_child(child)
            .map(|_| ())
            .map_err(|e| js_error("removeChild", e))
    }

    fn request_fullscreen(&self) -> Result<()> {
        call_first(self.0.as_ref(), &REQUEST_FULLSCREEN)
    }

    fn focus(&self) -> Result<()> {
        self.0.focus().map_err(|e| js_error("focus", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `document` handle
#[derive(Debug, Clone)]
pub struct WebDocument(web_sys::Document);

impl WebDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self(document)
    }

    /// The page's document
    pub fn global() -> Result<Self> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self)
            .ok_or_else(|| Error::dom("no document available"))
    }

    pub fn inner(&self) -> &web_sys::Document {
        &self.0
    }

    /// Node currently in fullscreen, whichever prefix the engine uses
    pub fn fullscreen_element(&self) -> Option<web_sys::Element> {
        FULLSCREEN_ELEMENT.iter().find_map(|name| {
            Reflect::get(self.0.as_ref(), &JsValue::from_str(name))
                .ok()
                .and_then(|value| value.dyn_into::<web_sys::Element>().ok())
        })
    }
}

impl Document for WebDocument {
    fn create_element(&self, tag: &str) -> Result<ElementRef> {
        let element = self
            .0
            .create_element(tag)
            .map_err(|e| js_error("createElement", e))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| Error::dom(format!("<{tag}> is not an HTML element")))?;
        Ok(Rc::new(WebElement(element)))
    }

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>> {
        let found = self
            .0
            .query_selector(selector)
            .map_err(|e| js_error("querySelector", e))?;
        Ok(found
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
            .map(|element| Rc::new(WebElement(element)) as ElementRef))
    }

    fn exit_fullscreen(&self) -> Result<()> {
        if self.fullscreen_element().is_none() {
            return Ok(());
        }
        call_first(self.0.as_ref(), &EXIT_FULLSCREEN)
    }

    fn revoke_object_url(&self, url: &str) {
        if let Err(e) = web_sys::Url::revoke_object_url(url) {
            tracing::warn!(url, error = ?e, "Failed to revoke object URL");
        }
    }
}
