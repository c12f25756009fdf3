//! Control endpoint
//!
//! RESTful administrative interface exposing the engine's general settings
//! and accepting live configuration pushes. It runs as a detached tokio task
//! started by the bootstrap orchestrator.
//!
//! # Security
//!
//! - Bearer secret authentication (constant-time comparison)
//! - An empty secret disables authentication; repaired controller addresses
//!   always bind loopback only

pub mod auth;
pub mod error;
pub mod handlers;
pub mod launcher;
pub mod server;

pub use self::error::{ControllerError, ControllerResult};
pub use self::handlers::ControllerState;
pub use self::launcher::{ControllerLauncher, TaskLauncher};
pub use self::server::{build_router, start_controller, ControllerConfig};
