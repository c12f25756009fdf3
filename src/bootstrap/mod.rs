//! Bootstrap orchestration
//!
//! Turns a configuration source into a running setup: load, optionally repair
//! ports, start the control endpoint and hand the result to the engine. Also
//! hosts the live update and validation-only paths.

pub mod repair;

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::common::{BridgeError, Result};
use crate::config::{Config, ConfigLoader};
use crate::context::Core;
use crate::controller::ControllerConfig;

pub use self::repair::{repair_controller, repair_proxy_ports};

/// Where a bootstrap reads its configuration from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The core's `config.yaml`
    Default,
    /// An explicit file
    Path(PathBuf),
    /// An in-memory document
    Bytes(Vec<u8>),
}

/// Bootstrap options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Check and replace unusable controller and listener ports
    pub repair_ports: bool,
    /// Override the configuration's `allow-lan`
    pub allow_lan: Option<bool>,
}

/// Bootstrap progress, strictly linear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Loading,
    Validating,
    Repairing,
    Starting,
    Applying,
    Done,
    Failed,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStage::Loading => "loading",
            BootstrapStage::Validating => "validating",
            BootstrapStage::Repairing => "repairing",
            BootstrapStage::Starting => "starting",
            BootstrapStage::Applying => "applying",
            BootstrapStage::Done => "done",
            BootstrapStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Controller coordinates reported to the host after a bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapReport {
    pub external_controller: String,
    pub secret: String,
}

impl BootstrapReport {
    /// JSON form handed across the FFI boundary
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| BridgeError::Other(e.to_string()))
    }
}

impl From<&Config> for BootstrapReport {
    fn from(config: &Config) -> Self {
        Self {
            external_controller: config.general.external_controller.clone(),
            secret: config.general.secret.clone(),
        }
    }
}

fn enter(stage: BootstrapStage) {
    debug!("Bootstrap stage: {}", stage);
}

/// Load, repair, start and apply a configuration
///
/// Loader errors come back unchanged. Nothing is rolled back on failure: a
/// control endpoint that was already started keeps running.
pub fn bootstrap(core: &Core, source: &ConfigSource, options: BootstrapOptions) -> Result<Config> {
    let _guard = core.lock();

    let result = run_stages(core, source, options);
    match &result {
        Ok(config) => {
            enter(BootstrapStage::Done);
            info!(
                "Bootstrap finished: controller {}, port {}, socks-port {}",
                config.general.external_controller, config.general.port, config.general.socks_port
            );
        }
        Err(e) => {
            enter(BootstrapStage::Failed);
            log::error!("Bootstrap failed: {}", e);
        }
    }
    result
}

fn run_stages(core: &Core, source: &ConfigSource, options: BootstrapOptions) -> Result<Config> {
    enter(BootstrapStage::Loading);
    let mut config = load(core.loader(), core.paths().config_file.as_path(), source)?;

    if options.repair_ports {
        enter(BootstrapStage::Validating);
        let general = &mut config.general;
        let controller_repaired = repair_controller(general, core.allocator())?;

        enter(BootstrapStage::Repairing);
        let allow_lan = options.allow_lan.unwrap_or(general.allow_lan);
        let ports = repair_proxy_ports(general, allow_lan, core.allocator());
        if controller_repaired || !ports.is_empty() {
            debug!("Repaired settings: controller {}, ports {:?}", controller_repaired, ports);
        }
    }

    if let Some(allow_lan) = options.allow_lan {
        config.general.allow_lan = allow_lan;
    }

    enter(BootstrapStage::Starting);
    let controller = ControllerConfig {
        listen_addr: config.general.external_controller.clone(),
        secret: config.general.secret.clone(),
        ui_path: resolve_ui_path(core, &config),
    };
    core.launcher().launch(controller, core.controller_state());

    enter(BootstrapStage::Applying);
    core.engine().apply(config.clone(), true)?;

    Ok(config)
}

fn load(loader: &dyn ConfigLoader, default_path: &Path, source: &ConfigSource) -> Result<Config> {
    let config = match source {
        ConfigSource::Default => loader.parse_path(default_path)?,
        ConfigSource::Path(path) => loader.parse_path(path)?,
        ConfigSource::Bytes(bytes) => loader.parse_bytes(bytes)?,
    };
    Ok(config)
}

/// Host-set UI path first, then `external-ui` relative to the home directory
fn resolve_ui_path(core: &Core, config: &Config) -> Option<PathBuf> {
    core.ui_path().or_else(|| {
        config
            .general
            .external_ui
            .as_deref()
            .filter(|ui| !ui.is_empty())
            .map(|ui| core.paths().home_dir.join(ui))
    })
}

/// Reload a configuration file and apply it incrementally
///
/// Ports are not checked and the control endpoint is not restarted.
pub fn update_config(core: &Core, path: &Path) -> Result<()> {
    let _guard = core.lock();

    let config = core.loader().parse_path(path)?;
    core.engine().apply(config, false)?;

    info!("Configuration updated from {}", path.display());
    Ok(())
}

/// Parse a configuration without touching running state
///
/// Fails with [`BridgeError::NoProxies`] when the document defines no proxy.
pub fn verify_config(loader: &dyn ConfigLoader, bytes: &[u8]) -> Result<()> {
    let config = loader.parse_bytes(bytes)?;
    if !config.has_proxies() {
        return Err(BridgeError::NoProxies);
    }
    Ok(())
}
