//! Native kernel - plays through the `<video>` element itself

use crate::dom::{js_error, WebElement};
use async_trait::async_trait;
use kino_player::kernel::{Kernel, KernelFactory, KernelSpec};
use kino_player::{BoxKind, Error, Result};
use std::cell::Cell;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlVideoElement;

const HLS_MIME: &str = "application/vnd.apple.mpegurl";

#[derive(Debug)]
pub struct NativeKernel {
    kind: BoxKind,
    video: HtmlVideoElement,
    destroyed: Cell<bool>,
}

impl NativeKernel {
    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed.get() {
            return Err(Error::kernel("kernel destroyed"));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Kernel for NativeKernel {
    fn box_kind(&self) -> BoxKind {
        self.kind.clone()
    }

    fn load(&self, src: &str) -> Result<()> {
        self.ensure_alive()?;
        self.video.set_src(src);
        self.video.load();
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.ensure_alive()?;
        let promise = self.video.play().map_err(|e| js_error("play", e))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| Error::kernel(format!("play rejected: {e:?}")))?;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.video.pause().map_err(|e| js_error("pause", e))
    }

    fn can_play_type(&self, mime: &str) -> String {
        self.video.can_play_type(mime)
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Err(e) = self.video.pause() {
            warn!(error = ?e, "Failed to pause video on kernel teardown");
        }
        if let Err(e) = self.video.remove_attribute("src") {
            warn!(error = ?e, "Failed to clear video source on kernel teardown");
        }
        self.video.load();
    }
}

/// Builds [`NativeKernel`]s. HLS is accepted only where the browser plays
/// it natively; flv and custom boxes need a JS kernel.
#[derive(Debug, Default)]
pub struct NativeKernelFactory;

impl KernelFactory for NativeKernelFactory {
    fn create(&self, spec: &KernelSpec) -> Result<Rc<dyn Kernel>> {
        let video = WebElement::unwrap_ref(&spec.video)?
            .clone()
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| Error::dom("kernel node is not a <video>"))?;

        match &spec.box_kind {
            BoxKind::Native => {}
            BoxKind::Hls if !video.can_play_type(HLS_MIME).is_empty() => {}
            other => return Err(Error::UnsupportedBox(other.to_string())),
        }

        if let Some(src) = &spec.src {
            video.set_src(src);
        }

        Ok(Rc::new(NativeKernel {
            kind: spec.box_kind.clone(),
            video,
            destroyed: Cell::new(false),
        }))
    }
}
