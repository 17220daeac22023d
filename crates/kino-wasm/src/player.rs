//! KinoPlayer - JavaScript-facing player class

use crate::dom::{WebDocument, WebElement};
use crate::kernel::NativeKernelFactory;
use js_sys::{Array, Function, Object, Promise, Reflect};
use kino_player::{
    dom::ElementRef, Dispatcher, Flow, FullscreenTarget, Handler, Host, ListenerId, Player,
    PlayerConfig, PluginDefinition, PluginRegistry, Target, VideoConfig, WatchId, WrapperSpec,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, HtmlElement, HtmlVideoElement};

thread_local! {
    static REGISTRY: PluginRegistry = PluginRegistry::new();
}

const FULLSCREEN_EVENTS: [&str; 4] = [
    "fullscreenchange",
    "webkitfullscreenchange",
    "mozfullscreenchange",
    "MSFullscreenChange",
];

fn to_js(value: &Value) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

/// Wrap a JS function; returning exactly `false` cancels vetoable events
fn js_handler(function: Function) -> Handler {
    Handler::new(move |event| {
        let args: Array = event.args.iter().map(to_js).collect();
        let result = function
            .apply(&JsValue::NULL, &args)
            .map_err(|e| anyhow::anyhow!("{} handler threw: {e:?}", event.name))?;
        Ok(Flow::from(result.as_bool() != Some(false)))
    })
}

/// `(name, function)` pairs of a plain JS object
fn function_entries(events: &JsValue) -> Result<Vec<(String, Function)>, JsError> {
    if events.is_undefined() || events.is_null() {
        return Ok(Vec::new());
    }
    let object = events
        .dyn_ref::<Object>()
        .ok_or_else(|| JsError::new("events must be an object"))?;

    Object::entries(object)
        .iter()
        .map(|entry| {
            let pair: Array = entry.unchecked_into();
            let name = pair
                .get(0)
                .as_string()
                .ok_or_else(|| JsError::new("event name must be a string"))?;
            let function = pair
                .get(1)
                .dyn_into::<Function>()
                .map_err(|_| JsError::new(&format!("handler for {name} is not a function")))?;
            Ok((name, function))
        })
        .collect()
}

/// Register a plugin for every player created afterwards
#[wasm_bindgen]
pub fn install(name: String, events: JsValue) -> Result<(), JsError> {
    let plugin = function_entries(&events)?
        .into_iter()
        .fold(PluginDefinition::new(name), |plugin, (event, function)| {
            plugin.on(event, js_handler(function))
        });
    REGISTRY.with(|registry| registry.install(plugin))?;
    Ok(())
}

/// Names of installed plugins
#[wasm_bindgen(js_name = installedPlugins)]
pub fn installed_plugins() -> Vec<String> {
    REGISTRY.with(PluginRegistry::names)
}

fn take_property(object: &Object, name: &str) -> JsValue {
    let key = JsValue::from_str(name);
    let value = Reflect::get(object, &key).unwrap_or(JsValue::UNDEFINED);
    if let Err(e) = Reflect::delete_property(object, &key) {
        tracing::warn!(property = name, error = ?e, "Failed to strip option");
    }
    value
}

fn web_wrapper(element: HtmlElement) -> WrapperSpec {
    let element: ElementRef = Rc::new(WebElement::new(element));
    WrapperSpec::Element(element)
}

/// DOM listener kept alive until the player is destroyed
struct DomListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    fn attach(
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(web_sys::Event)>,
    ) -> Result<Self, JsError> {
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|e| JsError::new(&format!("addEventListener({event}): {e:?}")))?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }

    fn detach(&self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            tracing::warn!(event = self.event, error = ?e, "Failed to remove DOM listener");
        }
    }
}

/// Read the `<video>` node's state into a config snapshot
fn snapshot(video: &HtmlVideoElement) -> VideoConfig {
    let mut config = VideoConfig::new();
    let duration = video.duration();
    if duration.is_finite() {
        config.insert("duration".into(), json!(duration));
    }
    config.insert("currentSrc".into(), json!(video.current_src()));
    config.insert("currentTime".into(), json!(video.current_time()));
    config.insert("videoWidth".into(), json!(video.video_width()));
    config.insert("videoHeight".into(), json!(video.video_height()));
    config.insert("readyState".into(), json!(video.ready_state()));
    config.insert("networkState".into(), json!(video.network_state()));
    config.insert("paused".into(), json!(video.paused()));
    config.insert("ended".into(), json!(video.ended()));
    config.insert("seeking".into(), json!(video.seeking()));
    config.insert("volume".into(), json!(video.volume()));
    config.insert("muted".into(), json!(video.muted()));
    config.insert("playbackRate".into(), json!(video.playback_rate()));
    config
}

/// Which triad node (if any) the document reports in fullscreen
fn fullscreen_target(document: &WebDocument, dispatcher: &Dispatcher) -> Option<FullscreenTarget> {
    let element: JsValue = document.fullscreen_element()?.into();
    let dom = dispatcher.dom();
    [
        (FullscreenTarget::Wrapper, &dom.wrapper),
        (FullscreenTarget::Container, &dom.container),
        (FullscreenTarget::Video, &dom.video_element),
    ]
    .into_iter()
    .find_map(|(target, node)| {
        let node: &JsValue = WebElement::unwrap_ref(node).ok()?.as_ref();
        (*node == element).then_some(target)
    })
}

#[wasm_bindgen]
pub struct KinoPlayer {
    player: Player,
    listeners: RefCell<Vec<DomListener>>,
    handlers: RefCell<Vec<(String, Function, ListenerId)>>,
    watchers: RefCell<Vec<(String, Function, WatchId)>>,
}

impl KinoPlayer {
    fn mount(config: PlayerConfig) -> Result<KinoPlayer, JsError> {
        let document = WebDocument::global()?;
        let host = Host::new(
            Rc::new(document.clone()),
            Rc::new(NativeKernelFactory),
            REGISTRY.with(PluginRegistry::clone),
        );
        let player = Player::new(config, &host)?;

        let kino = KinoPlayer {
            player,
            listeners: RefCell::new(Vec::new()),
            handlers: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
        };
        kino.bind_browser_events(document)?;
        Ok(kino)
    }

    fn bind_browser_events(&self, document: WebDocument) -> Result<(), JsError> {
        let dispatcher: Weak<Dispatcher> = Rc::downgrade(self.player.dispatcher());
        let video = WebElement::unwrap_ref(&self.player.dispatcher().dom().video_element)?
            .clone()
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| JsError::new("player node is not a <video>"))?;

        let mut listeners = self.listeners.borrow_mut();

        let weak = dispatcher.clone();
        let node = video.clone();
        let on_metadata = Closure::<dyn FnMut(web_sys::Event)>::new(move |_| {
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.video_config_ready(snapshot(&node));
            }
        });
        listeners.push(DomListener::attach(video.into(), "loadedmetadata", on_metadata)?);

        for event in FULLSCREEN_EVENTS.into_iter().chain(["fullscreenerror"]) {
            let weak = dispatcher.clone();
            let doc = document.clone();
            let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(move |_| {
                if let Some(dispatcher) = weak.upgrade() {
                    dispatcher.sync_fullscreen(fullscreen_target(&doc, &dispatcher));
                }
            });
            listeners.push(DomListener::attach(
                document.inner().clone().into(),
                event,
                on_change,
            )?);
        }
        Ok(())
    }
}

#[wasm_bindgen]
impl KinoPlayer {
    /// `new KinoPlayer({ wrapper, src, box, type, plugin, events })`, or
    /// `new KinoPlayer(element)` to mount into an element with defaults.
    /// `wrapper` is a selector or an element.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<KinoPlayer, JsError> {
        if let Some(element) = options.dyn_ref::<HtmlElement>() {
            let config = PlayerConfig::default().with_wrapper(web_wrapper(element.clone()));
            return Self::mount(config);
        }

        let plain = Object::assign(&Object::new(), options.unchecked_ref());
        let events = take_property(&plain, "events");
        let wrapper = Reflect::get(&plain, &JsValue::from_str("wrapper")).unwrap_or(JsValue::UNDEFINED);
        let element = wrapper.dyn_into::<HtmlElement>().ok();
        if element.is_some() {
            take_property(&plain, "wrapper");
        }

        let mut config: PlayerConfig = serde_wasm_bindgen::from_value(plain.into())?;
        if let Some(element) = element {
            config = config.with_wrapper(web_wrapper(element));
        }
        for (event, function) in function_entries(&events)? {
            config = config.with_event(event, js_handler(function));
        }
        Self::mount(config)
    }

    pub fn attr(&self, target: &str, key: &str) -> Result<Option<String>, JsError> {
        Ok(self.player.attr(target.parse::<Target>()?, key))
    }

    #[wasm_bindgen(js_name = setAttr)]
    pub fn set_attr(&self, target: &str, key: &str, value: JsValue) -> Result<(), JsError> {
        let value: Value = serde_wasm_bindgen::from_value(value)?;
        self.player.set_attr(target.parse::<Target>()?, key, value)?;
        Ok(())
    }

    pub fn css(&self, target: &str, key: &str) -> Result<Option<String>, JsError> {
        Ok(self.player.css(target.parse::<Target>()?, key))
    }

    #[wasm_bindgen(js_name = setCss)]
    pub fn set_css(&self, target: &str, key: &str, value: JsValue) -> Result<(), JsError> {
        let value: Value = serde_wasm_bindgen::from_value(value)?;
        self.player.set_css(target.parse::<Target>()?, key, value)?;
        Ok(())
    }

    /// Toggle without an argument
    pub fn fullscreen(&self, flag: Option<bool>) -> Result<bool, JsError> {
        Ok(self.player.fullscreen(flag)?)
    }

    #[wasm_bindgen(js_name = requestFullscreen)]
    pub fn request_fullscreen(&self, target: Option<String>) -> Result<bool, JsError> {
        let target = match target {
            Some(name) => name.parse::<FullscreenTarget>()?,
            None => FullscreenTarget::default(),
        };
        Ok(self.player.request_fullscreen(target)?)
    }

    #[wasm_bindgen(js_name = exitFullscreen)]
    pub fn exit_fullscreen(&self) -> Result<bool, JsError> {
        Ok(self.player.exit_fullscreen()?)
    }

    #[wasm_bindgen(getter, js_name = isFullscreen)]
    pub fn is_fullscreen(&self) -> bool {
        self.player.is_fullscreen()
    }

    #[wasm_bindgen(getter, js_name = fullscreenElement)]
    pub fn fullscreen_element(&self) -> Option<String> {
        self.player
            .fullscreen_element()
            .map(|target| target.dom_key().to_string())
    }

    pub fn focus(&self) -> Result<(), JsError> {
        Ok(self.player.focus()?)
    }

    pub fn play(&self) -> Promise {
        let player = self.player.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            player
                .play()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(|e| JsError::from(e).into())
        })
    }

    pub fn pause(&self) -> Promise {
        let player = self.player.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            player
                .pause()
                .await
                .map(|_| JsValue::UNDEFINED)
                .map_err(|e| JsError::from(e).into())
        })
    }

    pub fn load(&self, src: &str) -> Result<(), JsError> {
        Ok(self.player.load(src)?)
    }

    #[wasm_bindgen(js_name = canPlayType)]
    pub fn can_play_type(&self, mime: &str) -> String {
        self.player.can_play_type(mime)
    }

    pub fn on(&self, event: String, handler: Function) {
        let id = self.player.on(&event, js_handler(handler.clone()));
        self.handlers.borrow_mut().push((event, handler, id));
    }

    pub fn once(&self, event: String, handler: Function) {
        let id = self.player.once(&event, js_handler(handler.clone()));
        self.handlers.borrow_mut().push((event, handler, id));
    }

    /// Remove a handler added with `on`/`once`
    pub fn off(&self, event: &str, handler: &Function) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(index) = handlers
            .iter()
            .position(|(name, f, _)| name == event && Object::is(f, handler))
        else {
            return false;
        };
        let (_, _, id) = handlers.remove(index);
        self.player.off(event, id)
    }

    pub fn emit(&self, event: &str, args: Vec<JsValue>) -> Result<usize, JsError> {
        let args = args
            .into_iter()
            .map(serde_wasm_bindgen::from_value::<Value>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.player.emit(event, &args))
    }

    /// `callback(newValue, oldValue)`
    pub fn watch(&self, name: String, callback: Function) -> Result<(), JsError> {
        let f = callback.clone();
        let id = self.player.watch(&name, move |new, old| {
            if let Err(e) = f.call2(&JsValue::NULL, &to_js(new), &to_js(old)) {
                tracing::error!(error = ?e, "Watcher threw");
            }
        })?;
        self.watchers.borrow_mut().push((name, callback, id));
        Ok(())
    }

    pub fn unwatch(&self, name: &str, callback: &Function) -> Result<bool, JsError> {
        let mut watchers = self.watchers.borrow_mut();
        let Some(index) = watchers
            .iter()
            .position(|(n, f, _)| n == name && Object::is(f, callback))
        else {
            return Ok(false);
        };
        let (_, _, id) = watchers.remove(index);
        Ok(self.player.unwatch(name, id)?)
    }

    #[wasm_bindgen(js_name = setBox)]
    pub fn set_box(&self, kind: String) -> Result<(), JsError> {
        Ok(self.player.set_box(kind)?)
    }

    /// Deprecated: use `attr`/`css` with `"video"`
    #[wasm_bindgen(getter, js_name = "$video")]
    pub fn video(&self) -> Result<HtmlElement, JsError> {
        Ok(WebElement::unwrap_ref(&self.player.video())?.clone())
    }

    /// Deprecated: use `attr`/`css` with `"container"`
    #[wasm_bindgen(getter, js_name = "$container")]
    pub fn container(&self) -> Result<HtmlElement, JsError> {
        Ok(WebElement::unwrap_ref(&self.player.container())?.clone())
    }

    /// Deprecated: use `attr`/`css` with `"wrapper"`
    #[wasm_bindgen(getter, js_name = "$wrapper")]
    pub fn wrapper(&self) -> Result<HtmlElement, JsError> {
        Ok(WebElement::unwrap_ref(&self.player.wrapper())?.clone())
    }

    #[wasm_bindgen(getter, js_name = boxKind)]
    pub fn box_kind(&self) -> String {
        self.player.box_kind().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn plugins(&self) -> Vec<String> {
        self.player.plugins()
    }

    #[wasm_bindgen(getter)]
    pub fn destroyed(&self) -> bool {
        self.player.is_destroyed()
    }

    pub fn destroy(&self) {
        for listener in self.listeners.borrow_mut().drain(..) {
            listener.detach();
        }
        self.handlers.borrow_mut().clear();
        self.watchers.borrow_mut().clear();
        self.player.destroy();
    }
}
