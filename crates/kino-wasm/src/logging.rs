//! Tracing output for the browser console

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};
use wasm_bindgen::JsValue;
use web_sys::console;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Forwards events to `console.*` by level
struct ConsoleLayer;

#[derive(Default)]
struct Fields {
    message: String,
    extra: Vec<String>,
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.extra.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.extra.push(format!("{}={value}", field.name()));
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let max_level = if VERBOSE.load(Ordering::Relaxed) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        if *meta.level() > max_level {
            return;
        }

        let mut fields = Fields::default();
        event.record(&mut fields);

        let mut line = format!("[Kino] {}: {}", meta.target(), fields.message);
        if !fields.extra.is_empty() {
            line.push(' ');
            line.push_str(&fields.extra.join(" "));
        }
        let line = JsValue::from_str(&line);

        match *meta.level() {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::info_1(&line),
            _ => console::debug_1(&line),
        }
    }
}

/// Install the console subscriber. Later calls are ignored.
pub fn init() {
    let _ = Registry::default().with(ConsoleLayer).try_init();
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}
