//! Plugins
//!
//! A plugin is a named bundle of event handlers. Definitions are installed
//! once into a [`PluginRegistry`] shared by every player built from it;
//! each player instantiates the plugins it names at construction and tears
//! them down on `destroy()`.

use crate::{
    events::{EventBus, Handler, ListenerId},
    Error, PlayerId, Result,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Lifecycle hook, called with the plugin name and the owning player
pub type PluginHook = Rc<dyn Fn(&str, PlayerId)>;

/// Installable plugin
#[derive(Clone)]
pub struct PluginDefinition {
    name: String,
    events: Vec<(String, Handler)>,
    on_create: Option<PluginHook>,
    on_destroy: Option<PluginHook>,
}

impl PluginDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            on_create: None,
            on_destroy: None,
        }
    }

    /// Subscribe `handler` to `event` on every player using this plugin
    pub fn on(mut self, event: impl Into<String>, handler: Handler) -> Self {
        self.events.push((event.into(), handler));
        self
    }

    pub fn on_create<F: Fn(&str, PlayerId) + 'static>(mut self, hook: F) -> Self {
        self.on_create = Some(Rc::new(hook));
        self
    }

    pub fn on_destroy<F: Fn(&str, PlayerId) + 'static>(mut self, hook: F) -> Self {
        self.on_destroy = Some(Rc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|(name, _)| name.as_str())
    }

    /// Subscribe the plugin's handlers on a player's bus
    pub(crate) fn instantiate(&self, bus: &EventBus, player: PlayerId) -> PluginInstance {
        let listeners = self
            .events
            .iter()
            .map(|(event, handler)| (event.clone(), bus.on(event, handler.clone())))
            .collect();

        if let Some(hook) = &self.on_create {
            hook(&self.name, player);
        }
        debug!(plugin = %self.name, player = %player, "Plugin instantiated");

        PluginInstance {
            name: self.name.clone(),
            listeners,
            on_destroy: self.on_destroy.clone(),
        }
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("events", &self.events().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Per-player plugin state
pub struct PluginInstance {
    name: String,
    listeners: Vec<(String, ListenerId)>,
    on_destroy: Option<PluginHook>,
}

impl PluginInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unsubscribe the plugin's handlers and run its destroy hook
    pub(crate) fn teardown(self, bus: &EventBus, player: PlayerId) {
        for (event, id) in &self.listeners {
            bus.off(event, *id);
        }
        if let Some(hook) = &self.on_destroy {
            hook(&self.name, player);
        }
        debug!(plugin = %self.name, player = %player, "Plugin torn down");
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Process-wide plugin registry, passed to players explicitly.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Rc<RefCell<HashMap<String, PluginDefinition>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a plugin. A name that is already taken is rejected so that
    /// players built earlier keep the behavior they were built with.
    pub fn install(&self, plugin: PluginDefinition) -> Result<()> {
        let mut plugins = self.plugins.borrow_mut();
        if plugins.contains_key(plugin.name()) {
            warn!(plugin = plugin.name(), "Plugin already installed, ignoring");
            return Err(Error::DuplicatePlugin(plugin.name().to_string()));
        }
        info!(plugin = plugin.name(), "Plugin installed");
        plugins.insert(plugin.name().to_string(), plugin);
        Ok(())
    }

    pub fn uninstall(&self, name: &str) -> Option<PluginDefinition> {
        self.plugins.borrow_mut().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.borrow().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<PluginDefinition> {
        self.plugins
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::PluginNotInstalled(name.to_string()))
    }

    /// Installed plugin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Flow;
    use std::cell::Cell;

    #[test]
    fn test_duplicate_install_rejected() {
        let registry = PluginRegistry::new();
        registry.install(PluginDefinition::new("stopFullscreen")).unwrap();

        let err = registry.install(PluginDefinition::new("stopFullscreen")).unwrap_err();
        assert!(matches!(err, Error::DuplicatePlugin(ref n) if n == "stopFullscreen"));
        assert_eq!(registry.names(), vec!["stopFullscreen".to_string()]);
    }

    #[test]
    fn test_registry_handles_share_state() {
        let registry = PluginRegistry::new();
        let other = registry.clone();
        registry.install(PluginDefinition::new("a")).unwrap();

        assert!(other.contains("a"));
        assert!(other.uninstall("a").is_some());
        assert!(!registry.contains("a"));
        assert!(matches!(registry.get("a"), Err(Error::PluginNotInstalled(_))));
    }

    #[test]
    fn test_instantiate_and_teardown() {
        let bus = EventBus::new();
        let created = Rc::new(Cell::new(0));
        let destroyed = Rc::new(Cell::new(0));
        let (c, d) = (created.clone(), destroyed.clone());

        let plugin = PluginDefinition::new("guard")
            .on("beforeFullscreen", Handler::new(|_| Ok(Flow::Cancel)))
            .on("play", Handler::observer(|_| {}))
            .on_create(move |_, _| c.set(c.get() + 1))
            .on_destroy(move |_, _| d.set(d.get() + 1));

        let player = PlayerId::new();
        let instance = plugin.instantiate(&bus, player);
        assert_eq!(instance.name(), "guard");
        assert_eq!(created.get(), 1);
        assert_eq!(bus.listener_count("beforeFullscreen"), 1);

        instance.teardown(&bus, player);
        assert_eq!(destroyed.get(), 1);
        assert_eq!(bus.listener_count("beforeFullscreen"), 0);
        assert_eq!(bus.listener_count("play"), 0);
    }
}
