//! Player - application-facing handle
//!
//! Thin wrapper over a shared [`Dispatcher`]. Values passed to setters are
//! anything convertible into a JSON value, so `player.set_attr(t, k, 1)` and
//! `player.set_attr(t, k, "1")` both work.

use crate::{
    config::{Host, PlayerConfig},
    dispatcher::Dispatcher,
    dom::ElementRef,
    events::{Handler, ListenerId},
    watch::WatchId,
    BoxKind, FullscreenTarget, PlayerId, Result, Target, VideoConfig,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::warn;

/// Media player instance
#[derive(Debug, Clone)]
pub struct Player {
    dispatcher: Rc<Dispatcher>,
}

impl Player {
    /// Build a player against the given host
    pub fn new(config: PlayerConfig, host: &Host) -> Result<Self> {
        Ok(Self {
            dispatcher: Rc::new(Dispatcher::new(config, host)?),
        })
    }

    /// Build a player on an in-memory document with headless kernels
    pub fn headless(config: PlayerConfig) -> Result<Self> {
        Self::new(config, &Host::headless())
    }

    pub fn id(&self) -> PlayerId {
        self.dispatcher.id()
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    pub fn attr(&self, target: Target, key: &str) -> Option<String> {
        self.dispatcher.attr(target, key)
    }

    pub fn set_attr(&self, target: Target, key: &str, value: impl Into<Value>) -> Result<()> {
        self.dispatcher.set_attr(target, key, &value.into())
    }

    pub fn css(&self, target: Target, key: &str) -> Option<String> {
        self.dispatcher.css(target, key)
    }

    pub fn set_css(&self, target: Target, key: &str, value: impl Into<Value>) -> Result<()> {
        self.dispatcher.set_css(target, key, &value.into())
    }

    pub fn fullscreen(&self, flag: Option<bool>) -> Result<bool> {
        self.dispatcher.fullscreen(flag)
    }

    pub fn request_fullscreen(&self, target: FullscreenTarget) -> Result<bool> {
        self.dispatcher.request_fullscreen(target)
    }

    pub fn exit_fullscreen(&self) -> Result<bool> {
        self.dispatcher.exit_fullscreen()
    }

    pub fn sync_fullscreen(&self, target: Option<FullscreenTarget>) -> bool {
        self.dispatcher.sync_fullscreen(target)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.dispatcher.is_fullscreen()
    }

    pub fn fullscreen_element(&self) -> Option<FullscreenTarget> {
        self.dispatcher.fullscreen_element()
    }

    pub fn focus(&self) -> Result<()> {
        self.dispatcher.focus()
    }

    pub fn watch<F>(&self, name: &str, callback: F) -> Result<WatchId>
    where
        F: Fn(&Value, &Value) + 'static,
    {
        self.dispatcher.watch(name, callback)
    }

    pub fn unwatch(&self, name: &str, id: WatchId) -> Result<bool> {
        self.dispatcher.unwatch(name, id)
    }

    pub fn on(&self, event: &str, handler: Handler) -> ListenerId {
        self.dispatcher.on(event, handler)
    }

    pub fn once(&self, event: &str, handler: Handler) -> ListenerId {
        self.dispatcher.once(event, handler)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.dispatcher.off(event, id)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.dispatcher.emit(event, args)
    }

    pub async fn play(&self) -> Result<()> {
        self.dispatcher.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.dispatcher.pause().await
    }

    pub fn load(&self, src: &str) -> Result<()> {
        self.dispatcher.load(src)
    }

    pub fn can_play_type(&self, mime: &str) -> String {
        self.dispatcher.can_play_type(mime)
    }

    pub fn box_kind(&self) -> BoxKind {
        self.dispatcher.box_kind()
    }

    pub fn set_box(&self, kind: impl Into<BoxKind>) -> Result<()> {
        self.dispatcher.set_box(kind.into())
    }

    pub fn video_config_ready(&self, snapshot: VideoConfig) {
        self.dispatcher.video_config_ready(snapshot)
    }

    pub fn is_video_config_ready(&self) -> bool {
        self.dispatcher.is_video_config_ready()
    }

    pub fn video_config(&self) -> VideoConfig {
        self.dispatcher.video_config()
    }

    pub fn plugins(&self) -> Vec<String> {
        self.dispatcher.plugin_names()
    }

    pub fn destroy(&self) {
        self.dispatcher.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.dispatcher.is_destroyed()
    }

    // === Deprecated node accessors ===

    /// The `<video>` node
    pub fn video(&self) -> ElementRef {
        warn!("video() is deprecated, use attr/css with Target::Video");
        self.dispatcher.dom().video_element.clone()
    }

    pub fn container(&self) -> ElementRef {
        warn!("container() is deprecated, use attr/css with Target::Container");
        self.dispatcher.dom().container.clone()
    }

    pub fn wrapper(&self) -> ElementRef {
        warn!("wrapper() is deprecated, use attr/css with Target::Wrapper");
        self.dispatcher.dom().wrapper.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_dispatcher() {
        let player = Player::headless(PlayerConfig::new("a.mp4")).unwrap();
        let other = player.clone();

        player.set_attr(Target::Wrapper, "data-id", 7).unwrap();
        assert_eq!(other.attr(Target::Wrapper, "data-id").as_deref(), Some("7"));
        assert_eq!(player.id(), other.id());
    }

    #[test]
    fn test_accessors_return_triad_nodes() {
        let player = Player::headless(PlayerConfig::new("a.mp4")).unwrap();
        let dom = player.dispatcher().dom();

        assert!(Rc::ptr_eq(&player.video(), &dom.video_element));
        assert!(Rc::ptr_eq(&player.container(), &dom.container));
        assert!(Rc::ptr_eq(&player.wrapper(), &dom.wrapper));
        assert_eq!(player.video().tag_name(), "video");
    }
}
