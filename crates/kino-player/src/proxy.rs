//! Property proxy
//!
//! Routes `attr`/`css` reads and writes to one of the three DOM targets, or,
//! for allow-listed video properties, to the kernel's video config.
//!
//! Video routing rules:
//! - read-only properties: writes rejected; reads `None` until the video
//!   config is ready, then the config value
//! - writable properties: writes and reads are ignored/`None` until ready,
//!   then go through the config (attributes are mirrored onto `<video>`)
//! - anything else: a plain attribute on the `<video>` node

use crate::{
    dom::DomTriad,
    render_video_value, value_to_string, video_property_kind, Result, Target, VideoConfig,
    VideoPropertyKind,
};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct PropertyProxy {
    video_config: RefCell<VideoConfig>,
    ready: Cell<bool>,
}

impl PropertyProxy {
    pub fn new(initial: VideoConfig) -> Self {
        Self {
            video_config: RefCell::new(initial),
            ready: Cell::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    /// Merge a kernel snapshot into the config and mark it ready
    pub fn mark_ready(&self, snapshot: VideoConfig) {
        self.video_config.borrow_mut().extend(snapshot);
        self.ready.set(true);
    }

    pub fn video_config(&self) -> VideoConfig {
        self.video_config.borrow().clone()
    }

    /// Write a config entry directly (kernel-originated values such as `src`)
    pub fn store(&self, key: &str, value: Value) {
        self.video_config.borrow_mut().insert(key.to_string(), value);
    }

    pub fn get_attr(&self, dom: &DomTriad, target: Target, key: &str) -> Option<String> {
        if target == Target::Video {
            if let Some(kind) = video_property_kind(key) {
                return self.read_video_config(kind, key);
            }
        }
        dom.node(target).attribute(key)
    }

    pub fn set_attr(&self, dom: &DomTriad, target: Target, key: &str, value: &Value) -> Result<()> {
        if target == Target::Video {
            if let Some(kind) = video_property_kind(key) {
                return self.write_video_config(dom, kind, key, value);
            }
        }

        let node = dom.node(target);
        debug!(target = %target, key, value = %value, "Set attribute");
        match value_to_string(value) {
            Some(s) => node.set_attribute(key, &s),
            None => node.remove_attribute(key),
        }
    }

    pub fn get_css(&self, dom: &DomTriad, target: Target, key: &str) -> Option<String> {
        dom.node(target).style_property(key)
    }

    pub fn set_css(&self, dom: &DomTriad, target: Target, key: &str, value: &Value) -> Result<()> {
        let node = dom.node(target);
        debug!(target = %target, key, value = %value, "Set style");
        match value_to_string(value) {
            Some(s) => node.set_style_property(key, &s),
            None => node.remove_style_property(key),
        }
    }

    fn read_video_config(&self, kind: VideoPropertyKind, key: &str) -> Option<String> {
        if !self.ready.get() {
            return None;
        }
        self.video_config
            .borrow()
            .get(key)
            .and_then(|value| render_video_value(kind, value))
    }

    fn write_video_config(
        &self,
        dom: &DomTriad,
        kind: VideoPropertyKind,
        key: &str,
        value: &Value,
    ) -> Result<()> {
        if kind == VideoPropertyKind::ReadOnly {
            warn!(key, "Refusing to write read-only video property");
            return Ok(());
        }
        if !self.ready.get() {
            warn!(key, "Video config not ready, write ignored");
            return Ok(());
        }

        self.store(key, value.clone());

        match kind {
            VideoPropertyKind::Attribute | VideoPropertyKind::BooleanAttribute => {
                let video = &dom.video_element;
                match render_video_value(kind, value) {
                    Some(s) if kind == VideoPropertyKind::BooleanAttribute => {
                        video.set_attribute(key, if s == "true" { "" } else { s.as_str() })
                    }
                    Some(s) => video.set_attribute(key, &s),
                    None => video.remove_attribute(key),
                }
            }
            VideoPropertyKind::Property | VideoPropertyKind::ReadOnly => Ok(()),
        }
    }
}
