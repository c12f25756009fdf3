//! Process-lifetime core context
//!
//! A [`Core`] bundles the resolved file locations with the collaborators the
//! bootstrap code talks to. It is created once (the FFI layer keeps a single
//! instance for the life of the process) and passed by reference to every
//! orchestrator call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::debug;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::common::{BridgeError, OsPortAllocator, PortAllocator, Result};
use crate::config::defaults::{self, DEFAULT_CONFIG_FILE, MMDB_FILE};
use crate::config::{ConfigLoader, YamlLoader};
use crate::controller::{ControllerLauncher, ControllerState, TaskLauncher};
use crate::engine::{Engine, InMemoryEngine};

/// File locations under the home configuration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorePaths {
    pub home_dir: PathBuf,
    pub config_file: PathBuf,
    pub mmdb: PathBuf,
}

impl CorePaths {
    /// Locations under an explicit home directory
    pub fn from_home(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        Self {
            config_file: home_dir.join(DEFAULT_CONFIG_FILE),
            mmdb: home_dir.join(MMDB_FILE),
            home_dir,
        }
    }

    /// Locations under the platform home directory
    ///
    /// `CLASH_HOME_DIR` overrides `~/.config/clash`.
    pub fn detect() -> Result<Self> {
        defaults::home_dir()
            .map(Self::from_home)
            .ok_or_else(|| BridgeError::Other("unable to determine the home directory".to_string()))
    }
}

/// Core context shared by every bootstrap, update and verify call
pub struct Core {
    paths: CorePaths,
    ui_path: RwLock<Option<PathBuf>>,
    loader: Arc<dyn ConfigLoader>,
    engine: Arc<dyn Engine>,
    allocator: Arc<dyn PortAllocator>,
    launcher: Arc<dyn ControllerLauncher>,
    guard: Arc<Mutex<()>>,
    // Kept alive for spawned controller tasks; `None` when running on a
    // caller-provided runtime or with an injected launcher.
    _runtime: Option<Runtime>,
}

impl Core {
    /// Start building a core rooted at `paths`
    pub fn builder(paths: CorePaths) -> CoreBuilder {
        CoreBuilder::new(paths)
    }

    pub fn paths(&self) -> &CorePaths {
        &self.paths
    }

    pub fn loader(&self) -> &dyn ConfigLoader {
        self.loader.as_ref()
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn allocator(&self) -> &dyn PortAllocator {
        self.allocator.as_ref()
    }

    pub fn launcher(&self) -> &dyn ControllerLauncher {
        self.launcher.as_ref()
    }

    /// Directory served under `/ui` by the next controller start
    pub fn ui_path(&self) -> Option<PathBuf> {
        self.ui_path.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Set the dashboard directory; takes effect on the next controller start
    pub fn set_ui_path(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut slot = self.ui_path.write().unwrap_or_else(PoisonError::into_inner);
        *slot = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path.to_path_buf())
        };
        debug!("Controller UI path set to {:?}", *slot);
    }

    /// Serialize configuration changes
    pub fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State handed to a freshly started control endpoint
    pub fn controller_state(&self) -> ControllerState {
        ControllerState {
            engine: Arc::clone(&self.engine),
            loader: Arc::clone(&self.loader),
            config_path: self.paths.config_file.clone(),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("paths", &self.paths)
            .field("ui_path", &self.ui_path())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Core`]
///
/// Unset collaborators fall back to the YAML loader, the in-memory engine,
/// the operating system allocator and a tokio task launcher.
pub struct CoreBuilder {
    paths: CorePaths,
    loader: Option<Arc<dyn ConfigLoader>>,
    engine: Option<Arc<dyn Engine>>,
    allocator: Option<Arc<dyn PortAllocator>>,
    launcher: Option<Arc<dyn ControllerLauncher>>,
}

impl CoreBuilder {
    pub fn new(paths: CorePaths) -> Self {
        Self {
            paths,
            loader: None,
            engine: None,
            allocator: None,
            launcher: None,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn PortAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ControllerLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Build the core
    ///
    /// Without an injected launcher the controller is spawned on the ambient
    /// tokio runtime when there is one, otherwise on a runtime owned by the
    /// core.
    pub fn build(self) -> Result<Core> {
        let mut runtime = None;
        let launcher = match self.launcher {
            Some(launcher) => launcher,
            None => {
                let handle = match Handle::try_current() {
                    Ok(handle) => handle,
                    Err(_) => {
                        let rt = Builder::new_multi_thread()
                            .worker_threads(2)
                            .thread_name("clash-controller")
                            .enable_all()
                            .build()?;
                        let handle = rt.handle().clone();
                        runtime = Some(rt);
                        handle
                    }
                };
                Arc::new(TaskLauncher::new(handle)) as Arc<dyn ControllerLauncher>
            }
        };

        debug!("Core rooted at {}", self.paths.home_dir.display());

        Ok(Core {
            paths: self.paths,
            ui_path: RwLock::new(None),
            loader: self.loader.unwrap_or_else(|| Arc::new(YamlLoader::new())),
            engine: self.engine.unwrap_or_else(|| Arc::new(InMemoryEngine::new())),
            allocator: self.allocator.unwrap_or_else(|| Arc::new(OsPortAllocator)),
            launcher,
            guard: Arc::new(Mutex::new(())),
            _runtime: runtime,
        })
    }
}
