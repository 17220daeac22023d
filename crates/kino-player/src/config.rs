//! Player configuration and injected collaborators

use crate::{
    dom::{Document, ElementRef, MemoryDocument},
    events::Handler,
    kernel::{HeadlessKernelFactory, KernelFactory},
    plugin::PluginRegistry,
    BoxKind, Error, FullscreenTarget, Result, StreamType, VideoConfig,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::rc::Rc;

/// Where the player mounts itself
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub enum WrapperSpec {
    /// CSS selector resolved against the document
    Selector(String),
    /// Node supplied by the application
    Element(ElementRef),
}

impl Default for WrapperSpec {
    fn default() -> Self {
        WrapperSpec::Selector("body".to_string())
    }
}

impl From<String> for WrapperSpec {
    fn from(selector: String) -> Self {
        WrapperSpec::Selector(selector)
    }
}

impl From<ElementRef> for WrapperSpec {
    fn from(element: ElementRef) -> Self {
        WrapperSpec::Element(element)
    }
}

/// Player configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Media source URL
    pub src: Option<String>,
    /// Live or on-demand
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    /// Kernel selector; inferred from `src` when absent
    #[serde(rename = "box")]
    pub box_kind: Option<BoxKind>,
    /// Mount point
    pub wrapper: WrapperSpec,
    /// Installed plugins to instantiate, in order
    #[serde(rename = "plugin")]
    pub plugins: Vec<String>,
    /// Node used by `fullscreen()` without an explicit target
    pub fullscreen_target: FullscreenTarget,
    pub autoplay: bool,
    pub controls: bool,
    pub muted: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub preload: Option<String>,
    pub poster: Option<String>,
    /// Application event handlers, subscribed after plugin handlers
    #[serde(skip)]
    pub events: Vec<(String, Handler)>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            src: None,
            stream_type: StreamType::Vod,
            box_kind: None,
            wrapper: WrapperSpec::default(),
            plugins: Vec::new(),
            fullscreen_target: FullscreenTarget::Wrapper,
            autoplay: false,
            controls: false,
            muted: false,
            looping: false,
            preload: None,
            poster: None,
            events: Vec::new(),
        }
    }
}

impl PlayerConfig {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<WrapperSpec>) -> Self {
        self.wrapper = wrapper.into();
        self
    }

    pub fn with_box(mut self, kind: impl Into<BoxKind>) -> Self {
        self.box_kind = Some(kind.into());
        self
    }

    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(name.into());
        self
    }

    pub fn with_event(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.events.push((name.into(), handler));
        self
    }

    /// Box to start with
    pub fn resolved_box(&self) -> BoxKind {
        match (&self.box_kind, &self.src) {
            (Some(kind), _) => kind.clone(),
            (None, Some(src)) => BoxKind::infer(src),
            (None, None) => BoxKind::Native,
        }
    }

    /// Video config entries implied by the configuration
    pub fn initial_video_config(&self) -> VideoConfig {
        let mut config = VideoConfig::new();
        config.insert("autoplay".into(), json!(self.autoplay));
        config.insert("controls".into(), json!(self.controls));
        config.insert("muted".into(), json!(self.muted));
        config.insert("loop".into(), json!(self.looping));

        let optional = [
            ("src", &self.src),
            ("preload", &self.preload),
            ("poster", &self.poster),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                config.insert(key.into(), Value::String(value.clone()));
            }
        }
        config
    }
}

/// Collaborators a player is built against
#[derive(Debug, Clone)]
pub struct Host {
    pub document: Rc<dyn Document>,
    pub kernels: Rc<dyn KernelFactory>,
    pub plugins: PluginRegistry,
}

impl Host {
    pub fn new(
        document: Rc<dyn Document>,
        kernels: Rc<dyn KernelFactory>,
        plugins: PluginRegistry,
    ) -> Self {
        Self {
            document,
            kernels,
            plugins,
        }
    }

    /// In-memory document, headless kernels and an empty registry
    pub fn headless() -> Self {
        Self::new(
            MemoryDocument::new(),
            Rc::new(HeadlessKernelFactory::new()),
            PluginRegistry::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = PlayerConfig::from_json(
            r#"{
                "src": "http://cdn.example.com/lostStar.mp4",
                "type": "vod",
                "box": "native",
                "wrapper": "body",
                "plugin": ["stopFullscreen"],
                "fullscreenTarget": "container",
                "loop": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.src.as_deref(), Some("http://cdn.example.com/lostStar.mp4"));
        assert_eq!(config.box_kind, Some(BoxKind::Native));
        assert!(matches!(config.wrapper, WrapperSpec::Selector(ref s) if s == "body"));
        assert_eq!(config.plugins, vec!["stopFullscreen".to_string()]);
        assert_eq!(config.fullscreen_target, FullscreenTarget::Container);
        assert!(config.looping);
    }

    #[test]
    fn test_invalid_json() {
        let err = PlayerConfig::from_json(r#"{"type": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_resolved_box() {
        assert_eq!(PlayerConfig::default().resolved_box(), BoxKind::Native);
        assert_eq!(PlayerConfig::new("http://x/live.m3u8").resolved_box(), BoxKind::Hls);
        assert_eq!(
            PlayerConfig::new("http://x/live.m3u8").with_box("flv").resolved_box(),
            BoxKind::Flv
        );
    }

    #[test]
    fn test_initial_video_config() {
        let mut config = PlayerConfig::new("a.mp4");
        config.controls = true;
        let video = config.initial_video_config();

        assert_eq!(video.get("controls"), Some(&json!(true)));
        assert_eq!(video.get("src"), Some(&json!("a.mp4")));
        assert!(!video.contains_key("poster"));
    }
}
