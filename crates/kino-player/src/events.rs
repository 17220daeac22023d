//! Event bus
//!
//! Synchronous publish/subscribe used for plugin hooks (`beforeFullscreen`)
//! and public lifecycle events (`fullscreen`, `fullscreenchange`, `play`, ...).
//!
//! Two firing modes:
//! - plain: every handler runs, in subscription order; failures are logged
//! - vetoable: handlers run in subscription order until one returns
//!   [`Flow::Cancel`] or fails, which aborts the guarded operation

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Event delivered to handlers
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub name: &'a str,
    pub args: &'a [Value],
}

impl<'a> Event<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }
}

/// What a handler wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Abort the guarded operation (only meaningful for vetoable events)
    Cancel,
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Continue
        } else {
            Flow::Cancel
        }
    }
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

type HandlerFn = dyn Fn(&Event<'_>) -> anyhow::Result<Flow>;

/// Shared event handler
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event<'_>) -> anyhow::Result<Flow> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Handler that only observes and never vetoes
    pub fn observer<F>(f: F) -> Self
    where
        F: Fn(&Event<'_>) + 'static,
    {
        Self::new(move |event| {
            f(event);
            Ok(Flow::Continue)
        })
    }

    pub fn call(&self, event: &Event<'_>) -> anyhow::Result<Flow> {
        (self.0)(event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Token returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Outcome of a vetoable dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    Proceed,
    Vetoed,
    /// A handler failed; treated as an abort
    Erred(String),
}

impl EmitOutcome {
    pub fn should_proceed(&self) -> bool {
        matches!(self, EmitOutcome::Proceed)
    }
}

#[derive(Debug, Clone)]
struct Listener {
    id: ListenerId,
    handler: Handler,
    once: bool,
}

/// Event bus keyed by event name
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<String, Vec<Listener>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler
    pub fn on(&self, name: &str, handler: Handler) -> ListenerId {
        self.subscribe(name, handler, false)
    }

    /// Subscribe a handler that is removed after its first call
    pub fn once(&self, name: &str, handler: Handler) -> ListenerId {
        self.subscribe(name, handler, true)
    }

    /// Unsubscribe one handler. Returns false if it was not subscribed.
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    /// Drop every handler for an event
    pub fn off_all(&self, name: &str) {
        self.listeners.borrow_mut().remove(name);
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.borrow().get(name).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Plain dispatch: run every handler, log failures. Returns the number of
    /// handlers run.
    pub fn emit(&self, name: &str, args: &[Value]) -> usize {
        let listeners = self.take_snapshot(name);
        let event = Event { name, args };

        let mut called = 0;
        for listener in &listeners {
            if !self.claim(name, listener) {
                continue;
            }
            called += 1;
            if let Err(e) = listener.handler.call(&event) {
                error!(event = name, error = %e, "Event handler failed");
            }
        }

        debug!(event = name, handlers = called, "Event emitted");
        called
    }

    /// Vetoable dispatch: stop at the first handler that cancels or fails
    pub fn emit_vetoable(&self, name: &str, args: &[Value]) -> EmitOutcome {
        let listeners = self.take_snapshot(name);
        let event = Event { name, args };

        for listener in &listeners {
            if !self.claim(name, listener) {
                continue;
            }
            match listener.handler.call(&event) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Cancel) => {
                    warn!(event = name, "Operation vetoed by handler");
                    return EmitOutcome::Vetoed;
                }
                Err(e) => {
                    warn!(event = name, error = %e, "Handler failed, aborting operation");
                    return EmitOutcome::Erred(e.to_string());
                }
            }
        }

        EmitOutcome::Proceed
    }

    fn subscribe(&self, name: &str, handler: Handler, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        self.listeners
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(Listener { id, handler, once });
        id
    }

    /// Copy the handler list so handlers may subscribe/unsubscribe while
    /// being called
    fn take_snapshot(&self, name: &str) -> Vec<Listener> {
        self.listeners
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// A one-shot listener is unsubscribed right before it runs. Returns
    /// false when it already ran in a nested dispatch.
    fn claim(&self, name: &str, listener: &Listener) -> bool {
        !listener.once || self.off(name, listener.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Handler {
        let log = log.clone();
        let tag = tag.to_string();
        Handler::observer(move |event| log.borrow_mut().push(format!("{tag}:{}", event.name)))
    }

    #[test]
    fn test_plain_emit_in_subscription_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.on("fullscreen", recorder(&log, "a"));
        bus.on("fullscreen", recorder(&log, "b"));

        assert_eq!(bus.emit("fullscreen", &[json!(true)]), 2);
        assert_eq!(*log.borrow(), vec!["a:fullscreen", "b:fullscreen"]);
    }

    #[test]
    fn test_plain_emit_survives_failing_handler() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.on("fullscreenchange", Handler::new(|_| anyhow::bail!("boom")));
        bus.on("fullscreenchange", recorder(&log, "after"));

        bus.emit("fullscreenchange", &[]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_veto_short_circuits() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.on("beforeFullscreen", Handler::new(|_| Ok(Flow::from(false))));
        bus.on("beforeFullscreen", recorder(&log, "late"));

        assert_eq!(bus.emit_vetoable("beforeFullscreen", &[]), EmitOutcome::Vetoed);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_failing_vetoable_handler_aborts() {
        let bus = EventBus::new();
        bus.on("beforeFullscreen", Handler::new(|_| anyhow::bail!("plugin crashed")));

        let outcome = bus.emit_vetoable("beforeFullscreen", &[]);
        assert_eq!(outcome, EmitOutcome::Erred("plugin crashed".into()));
        assert!(!outcome.should_proceed());
    }

    #[test]
    fn test_proceed_without_handlers() {
        let bus = EventBus::new();
        assert!(bus.emit_vetoable("beforeFullscreen", &[]).should_proceed());
        assert_eq!(bus.emit("nothing", &[]), 0);
    }

    #[test]
    fn test_off_and_once() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = bus.on("play", recorder(&log, "on"));
        bus.once("play", recorder(&log, "once"));

        bus.emit("play", &[]);
        bus.emit("play", &[]);
        assert_eq!(*log.borrow(), vec!["on:play", "once:play", "on:play"]);

        assert!(bus.off("play", id));
        assert!(!bus.off("play", id));
        assert_eq!(bus.listener_count("play"), 0);
    }

    #[test]
    fn test_once_survives_veto_until_reached() {
        let bus = EventBus::new();
        let veto = Rc::new(Cell::new(true));
        let gate = veto.clone();
        bus.on("beforeFullscreen", Handler::new(move |_| Ok(Flow::from(!gate.get()))));

        let runs = Rc::new(Cell::new(0));
        let sink = runs.clone();
        bus.once("beforeFullscreen", Handler::observer(move |_| sink.set(sink.get() + 1)));

        assert_eq!(bus.emit_vetoable("beforeFullscreen", &[]), EmitOutcome::Vetoed);
        assert_eq!(runs.get(), 0);
        assert_eq!(bus.listener_count("beforeFullscreen"), 2);

        veto.set(false);
        assert!(bus.emit_vetoable("beforeFullscreen", &[]).should_proceed());
        assert!(bus.emit_vetoable("beforeFullscreen", &[]).should_proceed());
        assert_eq!(runs.get(), 1);
        assert_eq!(bus.listener_count("beforeFullscreen"), 1);
    }

    #[test]
    fn test_once_runs_once_under_nested_emit() {
        let bus = Rc::new(EventBus::new());
        let nested = Rc::new(Cell::new(false));
        let (inner, flag) = (bus.clone(), nested.clone());
        bus.on(
            "tick",
            Handler::observer(move |_| {
                if !flag.replace(true) {
                    inner.emit("tick", &[]);
                }
            }),
        );
        let runs = Rc::new(Cell::new(0));
        let sink = runs.clone();
        bus.once("tick", Handler::observer(move |_| sink.set(sink.get() + 1)));

        bus.emit("tick", &[]);
        assert_eq!(runs.get(), 1);
        assert_eq!(bus.listener_count("tick"), 1);
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let bus = Rc::new(EventBus::new());
        let inner = bus.clone();
        bus.on(
            "ready",
            Handler::observer(move |_| {
                inner.on("ready", Handler::observer(|_| {}));
            }),
        );

        assert_eq!(bus.emit("ready", &[]), 1);
        assert_eq!(bus.listener_count("ready"), 2);
    }

    #[test]
    fn test_event_args() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        bus.on(
            "fullscreen",
            Handler::observer(move |event| *sink.borrow_mut() = event.arg(1).cloned()),
        );

        bus.emit("fullscreen", &[json!(true), json!("wrapper")]);
        assert_eq!(*seen.borrow(), Some(json!("wrapper")));
    }
}
