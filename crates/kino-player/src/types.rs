//! Core types for Kino Player

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the three nodes of the DOM triad addressed by `attr` and `css`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Video,
    Container,
    Wrapper,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Video, Target::Container, Target::Wrapper];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Video => "video",
            Target::Container => "container",
            Target::Wrapper => "wrapper",
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Target::Video),
            "container" => Ok(Target::Container),
            "wrapper" => Ok(Target::Wrapper),
            other => Err(Error::InvalidTarget(other.to_string())),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node that can be put into fullscreen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullscreenTarget {
    #[default]
    Wrapper,
    Container,
    Video,
}

impl FullscreenTarget {
    /// Name carried by fullscreen event arguments
    pub fn name(&self) -> &'static str {
        match self {
            FullscreenTarget::Wrapper => "wrapper",
            FullscreenTarget::Container => "container",
            FullscreenTarget::Video => "video",
        }
    }

    /// Key under which the node is found in the DOM triad, and the value
    /// stored in the `fullscreenElement` watchable.
    ///
    /// The video node lives under `videoElement`, the other two under their
    /// bare names.
    pub fn dom_key(&self) -> &'static str {
        match self {
            FullscreenTarget::Wrapper => "wrapper",
            FullscreenTarget::Container => "container",
            FullscreenTarget::Video => "videoElement",
        }
    }
}

impl FromStr for FullscreenTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "videoElement" => Ok(FullscreenTarget::Video),
            other => Ok(Target::from_str(other)?.into()),
        }
    }
}

impl From<Target> for FullscreenTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Video => FullscreenTarget::Video,
            Target::Container => FullscreenTarget::Container,
            Target::Wrapper => FullscreenTarget::Wrapper,
        }
    }
}

impl std::fmt::Display for FullscreenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Playback kernel selector (the `box` option)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoxKind {
    Native,
    Flv,
    Hls,
    Other(String),
}

impl BoxKind {
    /// Pick a box from the source URL extension
    pub fn infer(src: &str) -> Self {
        let path = match Url::parse(src) {
            Ok(url) => url.path().to_lowercase(),
            Err(_) => src
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_lowercase(),
        };

        if path.ends_with(".flv") {
            BoxKind::Flv
        } else if path.ends_with(".m3u8") {
            BoxKind::Hls
        } else {
            BoxKind::Native
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BoxKind::Native => "native",
            BoxKind::Flv => "flv",
            BoxKind::Hls => "hls",
            BoxKind::Other(name) => name,
        }
    }
}

impl From<String> for BoxKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "native" | "" => BoxKind::Native,
            "flv" => BoxKind::Flv,
            "hls" => BoxKind::Hls,
            _ => BoxKind::Other(s),
        }
    }
}

impl From<&str> for BoxKind {
    fn from(s: &str) -> Self {
        BoxKind::from(s.to_string())
    }
}

impl From<BoxKind> for String {
    fn from(kind: BoxKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for BoxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live or on-demand content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Live,
    #[default]
    Vod,
}

/// How an allow-listed video property is backed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPropertyKind {
    /// Reported by the kernel, never writable through `attr`
    ReadOnly,
    /// Writable, mirrored onto the `<video>` node as a string attribute
    Attribute,
    /// Writable, mirrored as a presence attribute (absent when false)
    BooleanAttribute,
    /// Writable, kept only in the video config
    Property,
}

/// Allow-listed video properties routed through the video config
pub const VIDEO_PROPERTIES: &[(&str, VideoPropertyKind)] = &[
    ("buffered", VideoPropertyKind::ReadOnly),
    ("currentSrc", VideoPropertyKind::ReadOnly),
    ("duration", VideoPropertyKind::ReadOnly),
    ("ended", VideoPropertyKind::ReadOnly),
    ("error", VideoPropertyKind::ReadOnly),
    ("networkState", VideoPropertyKind::ReadOnly),
    ("paused", VideoPropertyKind::ReadOnly),
    ("played", VideoPropertyKind::ReadOnly),
    ("readyState", VideoPropertyKind::ReadOnly),
    ("seekable", VideoPropertyKind::ReadOnly),
    ("seeking", VideoPropertyKind::ReadOnly),
    ("videoHeight", VideoPropertyKind::ReadOnly),
    ("videoWidth", VideoPropertyKind::ReadOnly),
    ("src", VideoPropertyKind::Attribute),
    ("poster", VideoPropertyKind::Attribute),
    ("preload", VideoPropertyKind::Attribute),
    ("crossorigin", VideoPropertyKind::Attribute),
    ("width", VideoPropertyKind::Attribute),
    ("height", VideoPropertyKind::Attribute),
    ("x5-video-player-type", VideoPropertyKind::Attribute),
    ("x5-video-player-fullscreen", VideoPropertyKind::Attribute),
    ("x5-video-orientation", VideoPropertyKind::Attribute),
    ("autoplay", VideoPropertyKind::BooleanAttribute),
    ("controls", VideoPropertyKind::BooleanAttribute),
    ("loop", VideoPropertyKind::BooleanAttribute),
    ("muted", VideoPropertyKind::BooleanAttribute),
    ("playsinline", VideoPropertyKind::BooleanAttribute),
    ("currentTime", VideoPropertyKind::Property),
    ("volume", VideoPropertyKind::Property),
    ("playbackRate", VideoPropertyKind::Property),
    ("defaultPlaybackRate", VideoPropertyKind::Property),
    ("defaultMuted", VideoPropertyKind::Property),
];

/// Look up an allow-listed video property
pub fn video_property_kind(name: &str) -> Option<VideoPropertyKind> {
    VIDEO_PROPERTIES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, kind)| *kind)
}

/// Mirrored snapshot of video-element properties
pub type VideoConfig = BTreeMap<String, Value>;

/// Coerce a value into its attribute/style string form.
///
/// `null` means "remove".
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Render a video config value the way the `<video>` node would report it
pub fn render_video_value(kind: VideoPropertyKind, value: &Value) -> Option<String> {
    match (kind, value) {
        (VideoPropertyKind::BooleanAttribute, Value::Bool(false)) => None,
        _ => value_to_string(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_parsing() {
        assert_eq!("video".parse::<Target>().unwrap(), Target::Video);
        assert_eq!("wrapper".parse::<Target>().unwrap(), Target::Wrapper);

        let err = "body".parse::<Target>().unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(ref t) if t == "body"));
    }

    #[test]
    fn test_fullscreen_dom_keys() {
        assert_eq!(FullscreenTarget::Wrapper.dom_key(), "wrapper");
        assert_eq!(FullscreenTarget::Container.dom_key(), "container");
        assert_eq!(FullscreenTarget::Video.name(), "video");
        assert_eq!(FullscreenTarget::Video.dom_key(), "videoElement");
        assert_eq!(
            "videoElement".parse::<FullscreenTarget>().unwrap(),
            FullscreenTarget::Video
        );
    }

    #[test]
    fn test_box_inference() {
        assert_eq!(BoxKind::infer("http://cdn.example.com/a.flv"), BoxKind::Flv);
        assert_eq!(BoxKind::infer("https://example.com/live/master.m3u8?t=1"), BoxKind::Hls);
        assert_eq!(BoxKind::infer("http://cdn.example.com/lostStar.mp4"), BoxKind::Native);
        assert_eq!(BoxKind::infer("/relative/clip.FLV"), BoxKind::Flv);
    }

    #[test]
    fn test_box_from_string() {
        assert_eq!(BoxKind::from("native"), BoxKind::Native);
        assert_eq!(BoxKind::from("HLS"), BoxKind::Hls);
        assert_eq!(BoxKind::from("dash"), BoxKind::Other("dash".into()));
        assert_eq!(BoxKind::Other("dash".into()).to_string(), "dash");
    }

    #[test]
    fn test_video_property_table() {
        assert_eq!(video_property_kind("duration"), Some(VideoPropertyKind::ReadOnly));
        assert_eq!(video_property_kind("controls"), Some(VideoPropertyKind::BooleanAttribute));
        assert_eq!(video_property_kind("data-controls"), None);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(value_to_string(&json!(1)), Some("1".into()));
        assert_eq!(value_to_string(&json!(true)), Some("true".into()));
        assert_eq!(value_to_string(&json!("x")), Some("x".into()));
        assert_eq!(value_to_string(&Value::Null), None);
        assert_eq!(render_video_value(VideoPropertyKind::BooleanAttribute, &json!(false)), None);
        assert_eq!(render_video_value(VideoPropertyKind::Attribute, &json!(false)), Some("false".into()));
    }
}
