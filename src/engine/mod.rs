//! Engine collaborator
//!
//! The proxy engine itself lives outside this crate. [`Engine`] is the narrow
//! interface the bootstrap code and the control endpoint talk to, and
//! [`InMemoryEngine`] is the state holder used when no external engine is
//! plugged in.

pub mod state;

pub use self::state::{ApplyEvent, ConfigDiff, InMemoryEngine};

use crate::common::Result;
use crate::config::{Config, GeneralPatch, GeneralSettings, ProxyDef};

/// Interface to the running proxy engine
pub trait Engine: Send + Sync {
    /// Hand a configuration to the engine
    ///
    /// `initial` asks for fresh runtime state; otherwise the engine reconciles
    /// against what is already running.
    fn apply(&self, config: Config, initial: bool) -> Result<()>;

    /// Current general settings
    fn general(&self) -> GeneralSettings;

    /// Update selected general settings in place
    fn patch_general(&self, patch: &GeneralPatch) -> Result<GeneralSettings>;

    /// Currently configured proxies
    fn proxies(&self) -> Vec<ProxyDef>;
}
