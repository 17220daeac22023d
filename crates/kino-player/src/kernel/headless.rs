//! Headless kernel
//!
//! In-memory playback backend: tracks paused state and the loaded source
//! without decoding anything.

use super::{Kernel, KernelFactory, KernelSpec};
use crate::{BoxKind, Error, Result};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// MIME types each box answers for
fn supported_types(kind: &BoxKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        BoxKind::Native => &[
            ("video/mp4", "probably"),
            ("video/webm", "maybe"),
            ("audio/mp4", "maybe"),
            ("audio/mpeg", "maybe"),
        ],
        BoxKind::Flv => &[("video/x-flv", "probably"), ("video/mp4", "maybe")],
        BoxKind::Hls => &[
            ("application/vnd.apple.mpegurl", "probably"),
            ("application/x-mpegurl", "probably"),
            ("video/mp4", "maybe"),
        ],
        BoxKind::Other(_) => &[],
    }
}

#[derive(Debug)]
pub struct HeadlessKernel {
    kind: BoxKind,
    src: RefCell<Option<String>>,
    paused: Cell<bool>,
    destroyed: Cell<bool>,
}

impl HeadlessKernel {
    pub fn new(kind: BoxKind, src: Option<String>) -> Self {
        Self {
            kind,
            src: RefCell::new(src),
            paused: Cell::new(true),
            destroyed: Cell::new(false),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn src(&self) -> Option<String> {
        self.src.borrow().clone()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.get() {
            return Err(Error::kernel("kernel destroyed"));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Kernel for HeadlessKernel {
    fn box_kind(&self) -> BoxKind {
        self.kind.clone()
    }

    fn load(&self, src: &str) -> Result<()> {
        self.ensure_alive()?;
        *self.src.borrow_mut() = Some(src.to_string());
        self.paused.set(true);
        debug!(src, "Headless kernel loaded source");
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.src.borrow().is_none() {
            return Err(Error::kernel("no source loaded"));
        }
        self.paused.set(false);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.paused.set(true);
        Ok(())
    }

    fn can_play_type(&self, mime: &str) -> String {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_lowercase();
        supported_types(&self.kind)
            .iter()
            .find(|(ty, _)| *ty == essence)
            .map(|(_, answer)| answer.to_string())
            .unwrap_or_default()
    }

    fn destroy(&self) {
        self.destroyed.set(true);
        self.paused.set(true);
    }
}

/// Factory for [`HeadlessKernel`]; rejects `Other` boxes unless allowed
#[derive(Debug, Default)]
pub struct HeadlessKernelFactory {
    allow_custom_boxes: bool,
}

impl HeadlessKernelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also build kernels for boxes outside native/flv/hls
    pub fn allowing_custom_boxes() -> Self {
        Self {
            allow_custom_boxes: true,
        }
    }
}

impl KernelFactory for HeadlessKernelFactory {
    fn create(&self, spec: &KernelSpec) -> Result<Rc<dyn Kernel>> {
        if let BoxKind::Other(name) = &spec.box_kind {
            if !self.allow_custom_boxes {
                return Err(Error::UnsupportedBox(name.clone()));
            }
        }
        Ok(Rc::new(HeadlessKernel::new(spec.box_kind.clone(), spec.src.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, MemoryDocument};
    use crate::StreamType;

    fn spec(kind: BoxKind) -> KernelSpec {
        let doc = MemoryDocument::new();
        KernelSpec {
            box_kind: kind,
            video: doc.create_element("video").unwrap(),
            src: Some("http://cdn.example.com/a.mp4".into()),
            stream_type: StreamType::Vod,
        }
    }

    #[tokio::test]
    async fn test_play_pause() {
        let kernel = HeadlessKernel::new(BoxKind::Native, Some("a.mp4".into()));
        assert!(kernel.is_paused());
        kernel.play().await.unwrap();
        assert!(!kernel.is_paused());
        kernel.pause().await.unwrap();
        assert!(kernel.is_paused());
    }

    #[tokio::test]
    async fn test_destroyed_kernel_rejects() {
        let kernel = HeadlessKernel::new(BoxKind::Native, Some("a.mp4".into()));
        kernel.destroy();
        assert!(kernel.play().await.is_err());
        assert!(kernel.load("b.mp4").is_err());
        assert_eq!(kernel.can_play_type("video/mp4"), "probably");
    }

    #[tokio::test]
    async fn test_play_without_source_fails() {
        let kernel = HeadlessKernel::new(BoxKind::Native, None);
        assert!(kernel.play().await.is_err());
    }

    #[test]
    fn test_can_play_type_per_box() {
        let native = HeadlessKernel::new(BoxKind::Native, None);
        assert_eq!(native.can_play_type("video/mp4; codecs=\"avc1.42E01E\""), "probably");
        assert_eq!(native.can_play_type("video/x-flv"), "");

        let flv = HeadlessKernel::new(BoxKind::Flv, None);
        assert_eq!(flv.can_play_type("video/x-flv"), "probably");
    }

    #[test]
    fn test_factory_rejects_unknown_box() {
        let factory = HeadlessKernelFactory::new();
        let err = factory.create(&spec(BoxKind::Other("dash".into()))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBox(ref b) if b == "dash"));

        let kernel = factory.create(&spec(BoxKind::Hls)).unwrap();
        assert_eq!(kernel.box_kind(), BoxKind::Hls);

        let lenient = HeadlessKernelFactory::allowing_custom_boxes();
        assert!(lenient.create(&spec(BoxKind::Other("dash".into()))).is_ok());
    }
}
