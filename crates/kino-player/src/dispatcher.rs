//! Dispatcher - single owner of the DOM triad and the kernel
//!
//! Coordinates:
//! - attr/css routing through the property proxy
//! - plugin and application events on the event bus
//! - fullscreen transitions and the watch store
//! - kernel lifecycle (creation, box swaps, teardown)
//!
//! After `destroy()` every mutating call is refused: async calls fail with
//! [`Error::Destroyed`], synchronous ones become logged no-ops.

use crate::{
    config::{Host, PlayerConfig, WrapperSpec},
    dom::{Document, DomTriad, ElementRef},
    events::{EventBus, Handler, ListenerId},
    fullscreen::{FullscreenContext, FullscreenMachine, FullscreenState},
    kernel::{Kernel, KernelFactory, KernelSpec},
    plugin::PluginInstance,
    proxy::PropertyProxy,
    watch::{WatchId, WatchKey, WatchStore},
    BoxKind, Error, FullscreenTarget, PlayerId, Result, Target, VideoConfig,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

pub const PLAY: &str = "play";
pub const PAUSE: &str = "pause";
pub const LOAD: &str = "load";
pub const DESTROY: &str = "destroy";

/// Coordinates DOM, kernel, plugins and observable state for one player
pub struct Dispatcher {
    /// Player identity
    id: PlayerId,
    /// Construction-time configuration (without event handlers)
    config: PlayerConfig,
    /// DOM collaborator
    document: Rc<dyn Document>,
    /// Builds kernels on box changes
    kernels: Rc<dyn KernelFactory>,
    /// Wrapper, container and video nodes
    dom: DomTriad,
    /// Active kernel
    kernel: RefCell<Rc<dyn Kernel>>,
    proxy: PropertyProxy,
    bus: EventBus,
    watch: WatchStore,
    fullscreen: FullscreenMachine,
    /// Instantiated plugins, in configuration order
    plugins: RefCell<Vec<PluginInstance>>,
    /// `blob:` URLs to revoke at teardown
    object_urls: RefCell<Vec<String>>,
    destroyed: Cell<bool>,
}

impl Dispatcher {
    /// Mount the DOM triad, create the kernel and instantiate plugins
    pub fn new(mut config: PlayerConfig, host: &Host) -> Result<Self> {
        let id = PlayerId::new();

        // Resolve everything that can fail before touching the DOM
        let definitions = config
            .plugins
            .iter()
            .map(|name| host.plugins.get(name))
            .collect::<Result<Vec<_>>>()?;

        let wrapper = match &config.wrapper {
            WrapperSpec::Element(element) => element.clone(),
            WrapperSpec::Selector(selector) => host
                .document
                .query_selector(selector)?
                .ok_or_else(|| Error::InvalidConfig(format!("wrapper not found: {selector}")))?,
        };

        let dom = DomTriad::mount(host.document.as_ref(), wrapper)?;

        let box_kind = config.resolved_box();
        let spec = KernelSpec {
            box_kind: box_kind.clone(),
            video: dom.video_element.clone(),
            src: config.src.clone(),
            stream_type: config.stream_type,
        };
        let kernel = match host.kernels.create(&spec) {
            Ok(kernel) => kernel,
            Err(e) => {
                if let Err(unmount) = dom.unmount() {
                    warn!(error = %unmount, "Failed to unmount after kernel error");
                }
                return Err(e);
            }
        };

        let initial = config.initial_video_config();
        mirror_video_attributes(&dom.video_element, &initial)?;

        let events = std::mem::take(&mut config.events);
        let dispatcher = Self {
            id,
            document: host.document.clone(),
            kernels: host.kernels.clone(),
            dom,
            kernel: RefCell::new(kernel),
            proxy: PropertyProxy::new(initial),
            bus: EventBus::new(),
            watch: WatchStore::new(),
            fullscreen: FullscreenMachine::new(),
            plugins: RefCell::new(Vec::new()),
            object_urls: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
            config,
        };

        if let Some(src) = dispatcher.config.src.clone() {
            dispatcher.track_object_url(&src);
        }

        let instances = definitions
            .iter()
            .map(|definition| definition.instantiate(&dispatcher.bus, id))
            .collect();
        *dispatcher.plugins.borrow_mut() = instances;

        for (name, handler) in events {
            dispatcher.bus.on(&name, handler);
        }

        info!(
            player = %id,
            box_kind = %box_kind,
            plugins = dispatcher.config.plugins.len(),
            "Player created"
        );

        Ok(dispatcher)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn dom(&self) -> &DomTriad {
        &self.dom
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn watch_store(&self) -> &WatchStore {
        &self.watch
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.get() {
            return Err(Error::Destroyed);
        }
        Ok(())
    }

    /// True when a synchronous call should be skipped
    fn refuse_after_destroy(&self, operation: &str) -> bool {
        if self.destroyed.get() {
            warn!(player = %self.id, operation, "Player destroyed, call ignored");
            return true;
        }
        false
    }

    // === Properties ===

    pub fn attr(&self, target: Target, key: &str) -> Option<String> {
        self.proxy.get_attr(&self.dom, target, key)
    }

    pub fn set_attr(&self, target: Target, key: &str, value: &Value) -> Result<()> {
        if self.refuse_after_destroy("attr") {
            return Ok(());
        }
        self.proxy.set_attr(&self.dom, target, key, value)
    }

    pub fn css(&self, target: Target, key: &str) -> Option<String> {
        self.proxy.get_css(&self.dom, target, key)
    }

    pub fn set_css(&self, target: Target, key: &str, value: &Value) -> Result<()> {
        if self.refuse_after_destroy("css") {
            return Ok(());
        }
        self.proxy.set_css(&self.dom, target, key, value)
    }

    /// Kernel finished reading video metadata
    pub fn video_config_ready(&self, snapshot: VideoConfig) {
        if self.refuse_after_destroy("videoConfigReady") {
            return;
        }
        debug!(player = %self.id, entries = snapshot.len(), "Video config ready");
        self.proxy.mark_ready(snapshot);
    }

    pub fn is_video_config_ready(&self) -> bool {
        self.proxy.is_ready()
    }

    /// Force the readiness flag (kernel swaps reset it)
    pub fn set_video_config_ready(&self, ready: bool) {
        self.proxy.set_ready(ready);
    }

    pub fn video_config(&self) -> VideoConfig {
        self.proxy.video_config()
    }

    // === Fullscreen ===

    fn fullscreen_cx(&self) -> FullscreenContext<'_> {
        FullscreenContext {
            bus: &self.bus,
            watch: &self.watch,
            dom: &self.dom,
            document: self.document.as_ref(),
        }
    }

    pub fn fullscreen_state(&self) -> FullscreenState {
        self.fullscreen.state()
    }

    /// Toggle (`None`), enter (`Some(true)`) or leave (`Some(false)`)
    /// fullscreen on the configured default target
    pub fn fullscreen(&self, flag: Option<bool>) -> Result<bool> {
        let flag = flag.unwrap_or(!self.is_fullscreen());
        if flag {
            self.request_fullscreen(self.config.fullscreen_target)
        } else {
            self.exit_fullscreen()
        }
    }

    pub fn request_fullscreen(&self, target: FullscreenTarget) -> Result<bool> {
        if self.refuse_after_destroy("requestFullscreen") {
            return Ok(false);
        }
        self.fullscreen.request(target, self.fullscreen_cx())
    }

    pub fn exit_fullscreen(&self) -> Result<bool> {
        if self.refuse_after_destroy("exitFullscreen") {
            return Ok(false);
        }
        self.fullscreen.exit(self.fullscreen_cx())
    }

    /// Adopt a fullscreen change reported by the browser
    pub fn sync_fullscreen(&self, target: Option<FullscreenTarget>) -> bool {
        if self.refuse_after_destroy("syncFullscreen") {
            return false;
        }
        self.fullscreen.sync(target, self.fullscreen_cx())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.watch.get(WatchKey::IsFullscreen) == Value::Bool(true)
    }

    pub fn fullscreen_element(&self) -> Option<FullscreenTarget> {
        self.watch
            .get(WatchKey::FullscreenElement)
            .as_str()
            .and_then(|name| name.parse().ok())
    }

    // === Events ===

    pub fn on(&self, name: &str, handler: Handler) -> ListenerId {
        self.bus.on(name, handler)
    }

    pub fn once(&self, name: &str, handler: Handler) -> ListenerId {
        self.bus.once(name, handler)
    }

    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        self.bus.off(name, id)
    }

    pub fn emit(&self, name: &str, args: &[Value]) -> usize {
        if self.refuse_after_destroy("emit") {
            return 0;
        }
        self.bus.emit(name, args)
    }

    pub fn watch<F>(&self, name: &str, callback: F) -> Result<WatchId>
    where
        F: Fn(&Value, &Value) + 'static,
    {
        self.watch.watch(name, callback)
    }

    pub fn unwatch(&self, name: &str, id: WatchId) -> Result<bool> {
        self.watch.unwatch(name, id)
    }

    // === Kernel ===

    fn kernel(&self) -> Rc<dyn Kernel> {
        self.kernel.borrow().clone()
    }

    pub fn box_kind(&self) -> BoxKind {
        self.kernel().box_kind()
    }

    pub fn can_play_type(&self, mime: &str) -> String {
        self.kernel().can_play_type(mime)
    }

    #[instrument(skip(self), fields(player = %self.id))]
    pub async fn play(&self) -> Result<()> {
        self.ensure_alive()?;
        self.kernel().play().await?;
        // destroyed while the kernel was busy
        self.ensure_alive()?;
        self.bus.emit(PLAY, &[]);
        Ok(())
    }

    #[instrument(skip(self), fields(player = %self.id))]
    pub async fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.kernel().pause().await?;
        self.ensure_alive()?;
        self.bus.emit(PAUSE, &[]);
        Ok(())
    }

    /// Point the kernel at a new source
    pub fn load(&self, src: &str) -> Result<()> {
        self.ensure_alive()?;
        self.kernel().load(src)?;
        self.proxy.store("src", json!(src));
        self.track_object_url(src);
        info!(player = %self.id, src, "Source loaded");
        self.bus.emit(LOAD, &[json!(src)]);
        Ok(())
    }

    /// Replace the kernel with one for `kind`. The old kernel is only
    /// destroyed once the new one exists. Kernels share the `<video>` node,
    /// so the source is loaded again after the old kernel has released it.
    pub fn set_box(&self, kind: BoxKind) -> Result<()> {
        self.ensure_alive()?;
        let current = self.kernel();
        if current.box_kind() == kind {
            return Ok(());
        }

        let src = self
            .proxy
            .video_config()
            .get("src")
            .and_then(Value::as_str)
            .map(str::to_string);
        let spec = KernelSpec {
            box_kind: kind.clone(),
            video: self.dom.video_element.clone(),
            src: src.clone(),
            stream_type: self.config.stream_type,
        };
        let next = self.kernels.create(&spec)?;

        current.destroy();
        *self.kernel.borrow_mut() = next.clone();
        self.proxy.set_ready(false);

        info!(player = %self.id, from = %current.box_kind(), to = %kind, "Kernel swapped");
        if let Some(src) = src {
            next.load(&src)?;
        }
        Ok(())
    }

    // === Lifecycle ===

    pub fn focus(&self) -> Result<()> {
        if self.refuse_after_destroy("focus") {
            return Ok(());
        }
        self.dom.video_element.focus()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .borrow()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Tear the player down. Calling it again has no effect.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }

        self.bus.emit(DESTROY, &[]);

        if self.fullscreen.state().is_fullscreen() {
            if let Err(e) = self.fullscreen.exit(self.fullscreen_cx()) {
                warn!(player = %self.id, error = %e, "Failed to leave fullscreen on destroy");
            }
        }

        let plugins = std::mem::take(&mut *self.plugins.borrow_mut());
        for plugin in plugins {
            plugin.teardown(&self.bus, self.id);
        }

        self.kernel().destroy();

        let urls = std::mem::take(&mut *self.object_urls.borrow_mut());
        for url in urls {
            self.document.revoke_object_url(&url);
        }

        if let Err(e) = self.dom.unmount() {
            warn!(player = %self.id, error = %e, "Failed to unmount player");
        }

        self.bus.clear();
        self.watch.clear();

        info!(player = %self.id, "Player destroyed");
    }

    fn track_object_url(&self, src: &str) {
        if src.starts_with("blob:") {
            self.object_urls.borrow_mut().push(src.to_string());
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("fullscreen", &self.fullscreen.state())
            .field("video_config_ready", &self.proxy.is_ready())
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}

/// Reflect attribute-backed config entries onto the `<video>` node
fn mirror_video_attributes(video: &ElementRef, config: &VideoConfig) -> Result<()> {
    use crate::{render_video_value, video_property_kind, VideoPropertyKind};

    for (key, value) in config {
        match video_property_kind(key) {
            Some(kind @ VideoPropertyKind::Attribute) => match render_video_value(kind, value) {
                Some(s) => video.set_attribute(key, &s)?,
                None => video.remove_attribute(key)?,
            },
            Some(kind @ VideoPropertyKind::BooleanAttribute) => {
                if render_video_value(kind, value).is_some() {
                    video.set_attribute(key, "")?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
