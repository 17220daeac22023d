//! DOM collaborator interface and the player's DOM triad
//!
//! The player never builds markup itself: it asks a [`Document`] for nodes,
//! arranges them as wrapper ⊇ container ⊇ video, and afterwards only touches
//! their attributes, inline styles and fullscreen/focus state.

pub mod memory;

pub use memory::{MemoryDocument, MemoryElement};

use crate::{Error, FullscreenTarget, Result, Target};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a DOM node
pub type ElementRef = Rc<dyn Element>;

/// A DOM node as seen by the dispatcher
pub trait Element: fmt::Debug {
    /// Lowercase tag name
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&self, name: &str) -> Result<()>;

    /// Inline style property; `None` when unset
    fn style_property(&self, name: &str) -> Option<String>;

    fn set_style_property(&self, name: &str, value: &str) -> Result<()>;

    fn remove_style_property(&self, name: &str) -> Result<()>;

    fn append_child(&self, child: &ElementRef) -> Result<()>;

    fn remove_child(&self, child: &ElementRef) -> Result<()>;

    /// Ask the browser to put this node into fullscreen
    fn request_fullscreen(&self) -> Result<()>;

    fn focus(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Document-level services the dispatcher needs
pub trait Document: fmt::Debug {
    fn create_element(&self, tag: &str) -> Result<ElementRef>;

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>>;

    /// Leave fullscreen, whichever node holds it
    fn exit_fullscreen(&self) -> Result<()>;

    /// Release a `blob:` URL created for this player
    fn revoke_object_url(&self, url: &str);
}

/// The three nodes owned by a player
#[derive(Debug, Clone)]
pub struct DomTriad {
    pub wrapper: ElementRef,
    pub container: ElementRef,
    pub video_element: ElementRef,
}

impl DomTriad {
    /// Build the container and video nodes inside `wrapper`
    pub fn mount(document: &dyn Document, wrapper: ElementRef) -> Result<Self> {
        let container = document.create_element("container")?;
        let video_element = document.create_element("video")?;

        container.append_child(&video_element)?;
        wrapper.append_child(&container)?;

        container.set_style_property("position", "relative")?;
        container.set_style_property("z-index", "1")?;
        video_element.set_style_property("width", "100%")?;
        video_element.set_style_property("height", "100%")?;
        video_element.set_attribute("tabindex", "-1")?;

        Ok(Self {
            wrapper,
            container,
            video_element,
        })
    }

    /// Detach the container (and with it the video) from the wrapper
    pub fn unmount(&self) -> Result<()> {
        self.wrapper.remove_child(&self.container)
    }

    /// Node addressed by an attr/css target
    pub fn node(&self, target: Target) -> &ElementRef {
        match target {
            Target::Video => &self.video_element,
            Target::Container => &self.container,
            Target::Wrapper => &self.wrapper,
        }
    }

    pub fn fullscreen_node(&self, target: FullscreenTarget) -> &ElementRef {
        self.node(match target {
            FullscreenTarget::Video => Target::Video,
            FullscreenTarget::Container => Target::Container,
            FullscreenTarget::Wrapper => Target::Wrapper,
        })
    }

    /// Look a node up by its triad key (`wrapper`, `container`, `videoElement`)
    pub fn resolve(&self, key: &str) -> Result<&ElementRef> {
        match key {
            "wrapper" => Ok(&self.wrapper),
            "container" => Ok(&self.container),
            "videoElement" => Ok(&self.video_element),
            other => Err(Error::InvalidTarget(other.to_string())),
        }
    }
}
