//! Kino WASM - browser bindings for the Kino player
//!
//! Wires the DOM-agnostic player core to the real page:
//! - `web-sys` implementations of the player's document/element traits
//! - a native kernel that plays through the `<video>` element
//! - the `KinoPlayer` class and the page-wide plugin registry
//!
//! ## Usage
//!
//! ```javascript
//! import init, { KinoPlayer, install } from '@kino/wasm';
//!
//! await init();
//! install('stopFullscreen', { beforeFullscreen: () => false });
//! const player = new KinoPlayer({
//!   wrapper: '#player',
//!   src: 'https://cdn.example.com/lostStar.mp4',
//!   plugin: ['stopFullscreen'],
//! });
//! player.watch('isFullscreen', (now, before) => console.log(now, before));
//! await player.play();
//! ```

use wasm_bindgen::prelude::*;

mod dom;
mod kernel;
mod logging;
mod player;

pub use dom::{WebDocument, WebElement};
pub use kernel::{NativeKernel, NativeKernelFactory};
pub use player::{install, installed_plugins, KinoPlayer};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init();
    kino_player::init();
}

/// Include debug-level events in console output
#[wasm_bindgen(js_name = setDebugLogging)]
pub fn set_debug_logging(enabled: bool) {
    logging::set_verbose(enabled);
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
