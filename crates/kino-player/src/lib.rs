//! Kino Player - DOM-agnostic media player dispatcher
//!
//! This crate provides the core of an embeddable video player:
//! - DOM triad management (wrapper ⊇ container ⊇ video)
//! - Property routing for `attr`/`css` across the three nodes
//! - Event bus with vetoable events for plugins
//! - Reactive watch store for fullscreen state
//! - Fullscreen state machine
//! - Pluggable playback kernels selected by `box`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Kino Player                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Property   │  │  Fullscreen  │  │    Watch     │           │
//! │  │    Proxy     │  │   Machine    │  │    Store     │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │ Dispatcher  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │   Plugins    │  │    Event    │  │    Kernel    │            │
//! │  │   Registry   │  │     Bus     │  │  (box = ..)  │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is single-threaded: shared state lives in `Rc`/`RefCell` and
//! async calls are `?Send`.

pub mod error;
pub mod types;
pub mod config;
pub mod dom;
pub mod events;
pub mod watch;
pub mod fullscreen;
pub mod proxy;
pub mod kernel;
pub mod plugin;
pub mod dispatcher;
pub mod player;

pub use error::{Error, Result};
pub use types::*;
pub use config::{Host, PlayerConfig, WrapperSpec};
pub use dom::{Document, DomTriad, Element, ElementRef, MemoryDocument, MemoryElement};
pub use events::{EmitOutcome, Event, EventBus, Flow, Handler, ListenerId};
pub use watch::{WatchId, WatchKey, WatchStore};
pub use fullscreen::{FullscreenMachine, FullscreenState};
pub use proxy::PropertyProxy;
pub use kernel::{HeadlessKernel, HeadlessKernelFactory, Kernel, KernelFactory, KernelSpec};
pub use plugin::{PluginDefinition, PluginRegistry};
pub use dispatcher::Dispatcher;
pub use player::Player;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library
pub fn init() {
    tracing::info!(version = VERSION, "Kino Player initialized");
}
