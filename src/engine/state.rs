//! In-memory engine state
//!
//! Holds the applied configuration behind an `RwLock<Arc<_>>` so readers never
//! block a reload for long, counts generations and notifies listeners after
//! each change.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};

use crate::common::log::apply_level;
use crate::common::{BridgeError, Result};
use crate::config::{Config, General, GeneralPatch, GeneralSettings, ProxyDef};

use super::Engine;

/// Kind of state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyEvent {
    /// Fresh state was built from a configuration
    Initial,
    /// A configuration was reconciled against the running state
    Incremental,
    /// General settings were patched through the control endpoint
    Patched,
}

/// Summary of what an apply changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Changed general setting names (kebab-case)
    pub general: Vec<&'static str>,
    pub added_proxies: Vec<String>,
    pub removed_proxies: Vec<String>,
}

impl ConfigDiff {
    /// Compare two configurations
    pub fn between(old: &Config, new: &Config) -> Self {
        let general = general_changes(&old.general, &new.general);

        let added_proxies = new
            .proxy_names()
            .filter(|name| !old.proxy_names().any(|n| n == *name))
            .map(str::to_string)
            .collect();
        let removed_proxies = old
            .proxy_names()
            .filter(|name| !new.proxy_names().any(|n| n == *name))
            .map(str::to_string)
            .collect();

        Self { general, added_proxies, removed_proxies }
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.added_proxies.is_empty() && self.removed_proxies.is_empty()
    }
}

fn general_changes(old: &General, new: &General) -> Vec<&'static str> {
    let checks = [
        (old.port != new.port, "port"),
        (old.socks_port != new.socks_port, "socks-port"),
        (old.redir_port != new.redir_port, "redir-port"),
        (old.mixed_port != new.mixed_port, "mixed-port"),
        (old.allow_lan != new.allow_lan, "allow-lan"),
        (old.bind_address != new.bind_address, "bind-address"),
        (old.mode != new.mode, "mode"),
        (old.log_level != new.log_level, "log-level"),
        (old.ipv6 != new.ipv6, "ipv6"),
        (old.external_controller != new.external_controller, "external-controller"),
        (old.external_ui != new.external_ui, "external-ui"),
        (old.secret != new.secret, "secret"),
    ];

    checks.iter().filter(|(changed, _)| *changed).map(|(_, name)| *name).collect()
}

/// Listener invoked after every state change
pub type ApplyListener = Box<dyn Fn(ApplyEvent, &ConfigDiff) + Send + Sync>;

#[derive(Clone)]
struct Snapshot {
    config: Arc<Config>,
    generation: u64,
}

/// Engine state holder
#[derive(Default)]
pub struct InMemoryEngine {
    current: RwLock<Option<Snapshot>>,
    listeners: RwLock<Vec<ApplyListener>>,
}

impl InMemoryEngine {
    /// Create an engine with no configuration applied
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently applied configuration
    pub fn current(&self) -> Option<Arc<Config>> {
        self.snapshot().map(|s| s.config)
    }

    /// Number of applies since the last initial apply (0 before the first)
    pub fn generation(&self) -> u64 {
        self.snapshot().map(|s| s.generation).unwrap_or(0)
    }

    /// Add a state change listener
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(ApplyEvent, &ConfigDiff) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.push(Box::new(listener));
    }

    fn snapshot(&self) -> Option<Snapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store(&self, config: Config, generation: u64) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(Snapshot { config: Arc::new(config), generation });
    }

    fn notify_listeners(&self, event: ApplyEvent, diff: &ConfigDiff) {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event, diff);
        }
    }
}

impl Engine for InMemoryEngine {
    fn apply(&self, config: Config, initial: bool) -> Result<()> {
        let previous = self.snapshot();

        let (event, diff, generation) = match previous {
            Some(prev) if !initial => {
                let diff = ConfigDiff::between(&prev.config, &config);
                (ApplyEvent::Incremental, diff, prev.generation + 1)
            }
            None if !initial => {
                warn!("Incremental apply without running state; building fresh state");
                (ApplyEvent::Initial, ConfigDiff::default(), 1)
            }
            _ => (ApplyEvent::Initial, ConfigDiff::default(), 1),
        };

        apply_level(config.general.log_level);

        info!(
            "Applying configuration ({:?}, generation {}): mode {}, port {}, socks-port {}, allow-lan {}",
            event,
            generation,
            config.general.mode,
            config.general.port,
            config.general.socks_port,
            config.general.allow_lan
        );
        if !diff.is_empty() {
            debug!(
                "Changed settings: {:?}; added proxies: {:?}; removed proxies: {:?}",
                diff.general, diff.added_proxies, diff.removed_proxies
            );
        }

        self.store(config, generation);
        self.notify_listeners(event, &diff);

        Ok(())
    }

    fn general(&self) -> GeneralSettings {
        self.snapshot()
            .map(|s| s.config.settings())
            .unwrap_or_default()
    }

    fn patch_general(&self, patch: &GeneralPatch) -> Result<GeneralSettings> {
        let snapshot = self
            .snapshot()
            .ok_or_else(|| BridgeError::Apply("no configuration has been applied".to_string()))?;

        let mut config = snapshot.config.as_ref().clone();
        let changed = patch.apply_to(&mut config.general);
        let settings = config.settings();

        if changed.is_empty() {
            return Ok(settings);
        }

        if changed.contains(&"log-level") {
            apply_level(config.general.log_level);
        }
        info!("Patched general settings: {:?}", changed);

        let diff = ConfigDiff { general: changed, ..Default::default() };
        self.store(config, snapshot.generation + 1);
        self.notify_listeners(ApplyEvent::Patched, &diff);

        Ok(settings)
    }

    fn proxies(&self) -> Vec<ProxyDef> {
        self.snapshot()
            .map(|s| s.config.proxies.clone())
            .unwrap_or_default()
    }
}
