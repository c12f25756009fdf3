//! Detached control endpoint lifecycle
//!
//! Starting the control endpoint never blocks the caller and never reports
//! back to it; bind and serve failures go to the log. Each launch replaces
//! the previous server: the new task aborts the old one and waits for it to
//! release its socket before binding.

use std::sync::{Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::controller::handlers::ControllerState;
use crate::controller::server::{start_controller, ControllerConfig};

/// Starts the control endpoint
pub trait ControllerLauncher: Send + Sync {
    /// Start (or restart) the control endpoint without waiting for it
    fn launch(&self, config: ControllerConfig, state: ControllerState);
}

/// Launcher that spawns the server onto a tokio runtime
pub struct TaskLauncher {
    handle: Handle,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl TaskLauncher {
    /// Create a launcher spawning onto `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            running: Mutex::new(None),
        }
    }
}

impl ControllerLauncher for TaskLauncher {
    fn launch(&self, config: ControllerConfig, state: ControllerState) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = running.take();

        log::info!("Starting external controller on {}", config.listen_addr);

        let task = self.handle.spawn(async move {
            if let Some(previous) = previous {
                previous.abort();
                let _ = previous.await;
            }

            let addr = config.listen_addr.clone();
            if let Err(e) = start_controller(config, state).await {
                log::error!("External controller on {} failed: {}", addr, e);
            }
        });

        *running = Some(task);
    }
}

impl Drop for TaskLauncher {
    fn drop(&mut self) {
        let running = self.running.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = running.take() {
            task.abort();
        }
    }
}
