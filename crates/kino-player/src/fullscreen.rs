//! Fullscreen state machine
//!
//! ```text
//!            request(t)                  browser ok
//!  Exited ───────────────▶ Entering(t) ─────────────▶ Entered(t)
//!    ▲   ◀─── vetoed / browser error ──┘                   │
//!    │                                                     │ exit()
//!    └────────────────────── Exiting ◀─────────────────────┘
//! ```
//!
//! `beforeFullscreen` is the veto point. A successful transition updates
//! `isFullscreen`/`fullscreenElement` (the triad key of the node) in the
//! watch store, then fires plain `fullscreen` and `fullscreenchange` events.
//! A transition triggered from inside one of those notifications is published
//! after the current one, so observers see transitions in the order they
//! happened.

use crate::{
    dom::{Document, DomTriad},
    events::{EmitOutcome, EventBus},
    watch::{WatchKey, WatchStore},
    FullscreenTarget, Result,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

pub const BEFORE_FULLSCREEN: &str = "beforeFullscreen";
pub const FULLSCREEN: &str = "fullscreen";
pub const FULLSCREEN_CHANGE: &str = "fullscreenchange";

/// Fullscreen states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FullscreenState {
    #[default]
    Exited,
    Entering(FullscreenTarget),
    Entered(FullscreenTarget),
    Exiting,
}

impl FullscreenState {
    /// Boolean reported for no-op calls
    pub fn is_fullscreen(&self) -> bool {
        matches!(self, FullscreenState::Entering(_) | FullscreenState::Entered(_))
    }

    pub fn target(&self) -> Option<FullscreenTarget> {
        match self {
            FullscreenState::Entering(t) | FullscreenState::Entered(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for FullscreenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FullscreenState::Exited => write!(f, "exited"),
            FullscreenState::Entering(t) => write!(f, "entering({t})"),
            FullscreenState::Entered(t) => write!(f, "entered({t})"),
            FullscreenState::Exiting => write!(f, "exiting"),
        }
    }
}

/// Collaborators the machine drives during a transition
#[derive(Clone, Copy)]
pub struct FullscreenContext<'a> {
    pub bus: &'a EventBus,
    pub watch: &'a WatchStore,
    pub dom: &'a DomTriad,
    pub document: &'a dyn Document,
}

/// Cross-browser fullscreen state machine
#[derive(Debug, Default)]
pub struct FullscreenMachine {
    state: Cell<FullscreenState>,
    /// Transitions waiting for the current publish to finish
    pending: RefCell<VecDeque<Option<FullscreenTarget>>>,
    publishing: Cell<bool>,
}

impl FullscreenMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FullscreenState {
        self.state.get()
    }

    /// Enter fullscreen on `target`.
    ///
    /// Returns `Ok(false)` when a `beforeFullscreen` handler vetoes, and the
    /// current boolean when already entering or entered.
    pub fn request(&self, target: FullscreenTarget, cx: FullscreenContext<'_>) -> Result<bool> {
        let current = self.state.get();
        if current != FullscreenState::Exited {
            return Ok(current.is_fullscreen());
        }

        let args = [json!(true), json!(target.name())];
        match cx.bus.emit_vetoable(BEFORE_FULLSCREEN, &args) {
            EmitOutcome::Proceed => {}
            EmitOutcome::Vetoed | EmitOutcome::Erred(_) => {
                warn!(target = %target, "Fullscreen request vetoed");
                return Ok(false);
            }
        }

        self.state.set(FullscreenState::Entering(target));
        if let Err(e) = cx.dom.fullscreen_node(target).request_fullscreen() {
            self.state.set(FullscreenState::Exited);
            warn!(target = %target, error = %e, "Browser refused fullscreen");
            return Err(e);
        }
        self.state.set(FullscreenState::Entered(target));

        info!(target = %target, "Entered fullscreen");
        self.publish(cx, Some(target));
        Ok(true)
    }

    /// Leave fullscreen. Returns the resulting boolean; a no-op when not
    /// entered.
    pub fn exit(&self, cx: FullscreenContext<'_>) -> Result<bool> {
        let FullscreenState::Entered(target) = self.state.get() else {
            return Ok(self.state.get().is_fullscreen());
        };

        self.state.set(FullscreenState::Exiting);
        if let Err(e) = cx.document.exit_fullscreen() {
            self.state.set(FullscreenState::Entered(target));
            warn!(target = %target, error = %e, "Browser refused to exit fullscreen");
            return Err(e);
        }
        self.state.set(FullscreenState::Exited);

        info!(target = %target, "Exited fullscreen");
        self.publish(cx, None);
        Ok(false)
    }

    /// Adopt a fullscreen change the browser made on its own (Esc key, OS
    /// gesture). Neither the veto hook nor the browser API is involved.
    pub fn sync(&self, target: Option<FullscreenTarget>, cx: FullscreenContext<'_>) -> bool {
        let next = match target {
            Some(t) => FullscreenState::Entered(t),
            None => FullscreenState::Exited,
        };
        if self.state.get() == next {
            return next.is_fullscreen();
        }

        self.state.set(next);
        info!(state = %next, "Fullscreen changed outside the player");
        self.publish(cx, target);
        next.is_fullscreen()
    }

    fn publish(&self, cx: FullscreenContext<'_>, target: Option<FullscreenTarget>) {
        self.pending.borrow_mut().push_back(target);
        if self.publishing.get() {
            debug!("Fullscreen transition queued behind current publish");
            return;
        }

        let _guard = PublishGuard::enter(self);
        loop {
            let Some(next) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            Self::announce(cx, next);
        }
    }

    fn announce(cx: FullscreenContext<'_>, target: Option<FullscreenTarget>) {
        let flag = target.is_some();

        cx.watch.set_many(vec![
            (WatchKey::IsFullscreen, json!(flag)),
            (
                WatchKey::FullscreenElement,
                target.map_or(Value::Null, |t| json!(t.dom_key())),
            ),
        ]);

        let args = [json!(flag), target.map_or(Value::Null, |t| json!(t.name()))];
        cx.bus.emit(FULLSCREEN, &args);
        cx.bus.emit(FULLSCREEN_CHANGE, &args);
    }
}

/// Resets the publishing flag and drops queued transitions even if a
/// handler panics
struct PublishGuard<'a>(&'a FullscreenMachine);

impl<'a> PublishGuard<'a> {
    fn enter(machine: &'a FullscreenMachine) -> Self {
        machine.publishing.set(true);
        Self(machine)
    }
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.0.publishing.set(false);
        self.0.pending.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use crate::events::{Flow, Handler};
    use crate::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        doc: Rc<MemoryDocument>,
        dom: DomTriad,
        bus: EventBus,
        watch: WatchStore,
    }

    impl Fixture {
        fn new() -> Self {
            let doc = MemoryDocument::new();
            let wrapper = doc.create_element("div").unwrap();
            let dom = DomTriad::mount(&*doc, wrapper).unwrap();
            Self {
                doc,
                dom,
                bus: EventBus::new(),
                watch: WatchStore::new(),
            }
        }

        fn cx(&self) -> FullscreenContext<'_> {
            FullscreenContext {
                bus: &self.bus,
                watch: &self.watch,
                dom: &self.dom,
                document: &*self.doc,
            }
        }
    }

    #[test]
    fn test_request_and_exit() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();

        assert!(machine.request(FullscreenTarget::Container, fx.cx()).unwrap());
        assert_eq!(machine.state(), FullscreenState::Entered(FullscreenTarget::Container));
        assert!(fx.doc.is_fullscreen(&fx.dom.container));
        assert_eq!(fx.watch.get(WatchKey::FullscreenElement), json!("container"));

        assert!(!machine.exit(fx.cx()).unwrap());
        assert_eq!(machine.state(), FullscreenState::Exited);
        assert!(!fx.doc.has_fullscreen_element());
        assert_eq!(fx.watch.get(WatchKey::FullscreenElement), Value::Null);
    }

    #[test]
    fn test_veto_keeps_exited() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();
        let fired = Rc::new(Cell::new(0));
        let sink = fired.clone();
        fx.bus.on(BEFORE_FULLSCREEN, Handler::new(|_| Ok(Flow::Cancel)));
        fx.bus.on(FULLSCREEN, Handler::observer(move |_| sink.set(sink.get() + 1)));

        assert!(!machine.request(FullscreenTarget::Wrapper, fx.cx()).unwrap());
        assert_eq!(machine.state(), FullscreenState::Exited);
        assert_eq!(fired.get(), 0);
        assert!(!fx.doc.has_fullscreen_element());
    }

    #[test]
    fn test_repeated_calls_are_noops() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        fx.bus.on(FULLSCREEN_CHANGE, Handler::observer(move |_| sink.set(sink.get() + 1)));

        assert!(!machine.exit(fx.cx()).unwrap());
        assert!(machine.request(FullscreenTarget::Wrapper, fx.cx()).unwrap());
        assert!(machine.request(FullscreenTarget::Video, fx.cx()).unwrap());
        assert_eq!(machine.state().target(), Some(FullscreenTarget::Wrapper));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_browser_refusal_restores_exited() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();
        fx.doc.deny_fullscreen(true);

        let err = machine.request(FullscreenTarget::Video, fx.cx()).unwrap_err();
        assert!(matches!(err, Error::Fullscreen(_)));
        assert_eq!(machine.state(), FullscreenState::Exited);
        assert_eq!(fx.watch.get(WatchKey::IsFullscreen), json!(false));
    }

    #[test]
    fn test_sync_from_browser() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();
        let args = Rc::new(RefCell::new(Vec::new()));
        let sink = args.clone();
        fx.bus.on(
            FULLSCREEN,
            Handler::observer(move |event| sink.borrow_mut().push(event.args.to_vec())),
        );

        machine.request(FullscreenTarget::Video, fx.cx()).unwrap();
        assert!(!machine.sync(None, fx.cx()));
        assert!(!machine.sync(None, fx.cx()));

        assert_eq!(
            *args.borrow(),
            vec![vec![json!(true), json!("video")], vec![json!(false), Value::Null]]
        );
        assert_eq!(fx.watch.get(WatchKey::FullscreenElement), Value::Null);
    }

    #[test]
    fn test_exit_from_fullscreen_handler_is_published_in_order() {
        let fx = Rc::new(Fixture::new());
        let machine = Rc::new(FullscreenMachine::new());

        let (inner_fx, inner_machine) = (fx.clone(), machine.clone());
        fx.bus.on(
            FULLSCREEN,
            Handler::observer(move |event| {
                if event.arg(0) == Some(&json!(true)) {
                    inner_machine.exit(inner_fx.cx()).unwrap();
                }
            }),
        );

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        fx.bus.on(
            FULLSCREEN_CHANGE,
            Handler::observer(move |event| sink.borrow_mut().push(event.args[0].clone())),
        );
        let watched = Rc::new(RefCell::new(Vec::new()));
        let sink = watched.clone();
        fx.watch
            .watch("isFullscreen", move |new, _| sink.borrow_mut().push(new.clone()))
            .unwrap();

        assert!(machine.request(FullscreenTarget::Wrapper, fx.cx()).unwrap());

        assert_eq!(*changes.borrow(), vec![json!(true), json!(false)]);
        assert_eq!(*watched.borrow(), vec![json!(true), json!(false)]);
        assert_eq!(machine.state(), FullscreenState::Exited);
        assert_eq!(fx.watch.get(WatchKey::IsFullscreen), json!(false));
        assert!(!fx.doc.has_fullscreen_element());
    }

    #[test]
    fn test_video_target_stored_under_element_key() {
        let fx = Fixture::new();
        let machine = FullscreenMachine::new();

        machine.request(FullscreenTarget::Video, fx.cx()).unwrap();
        assert_eq!(fx.watch.get(WatchKey::FullscreenElement), json!("videoElement"));
        assert!(fx.doc.is_fullscreen(&fx.dom.video_element));
    }
}
