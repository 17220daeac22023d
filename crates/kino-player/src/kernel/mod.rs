//! Kernel collaborator interface
//!
//! A kernel is the playback backend selected by the `box` option. The
//! dispatcher owns exactly one at a time and only talks to it through
//! [`Kernel`].

mod headless;

pub use headless::{HeadlessKernel, HeadlessKernelFactory};

use crate::{dom::ElementRef, BoxKind, Result, StreamType};
use async_trait::async_trait;
use std::fmt;
use std::rc::Rc;

/// Playback backend bound to the player's `<video>` node
#[async_trait(?Send)]
pub trait Kernel: fmt::Debug {
    fn box_kind(&self) -> BoxKind;

    /// Point the backend at a new source
    fn load(&self, src: &str) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// `"probably"`, `"maybe"` or `""`, as `HTMLMediaElement.canPlayType`
    fn can_play_type(&self, mime: &str) -> String;

    /// Release backend resources. Further calls may fail.
    fn destroy(&self);
}

/// What a factory needs to build a kernel
#[derive(Debug, Clone)]
pub struct KernelSpec {
    pub box_kind: BoxKind,
    pub video: ElementRef,
    pub src: Option<String>,
    pub stream_type: StreamType,
}

/// Builds kernels for the boxes it supports
pub trait KernelFactory: fmt::Debug {
    fn create(&self, spec: &KernelSpec) -> Result<Rc<dyn Kernel>>;
}
