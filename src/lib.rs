//! Clash Bridge: configuration bootstrap for an embedded Clash core
//!
//! This library sits between a host application and the proxy engine. It
//! loads the YAML configuration, makes sure the control endpoint and the
//! proxy listeners get ports that can actually be bound, starts the control
//! endpoint and hands the result to the engine. Hosts drive it through a
//! small C interface (see [`ffi`]); Rust callers use [`bootstrap`] directly.
//!
//! # Main Features
//!
//! - Controller address validation with loopback reachability check
//! - Port probing and replacement from the OS ephemeral range
//! - RESTful control endpoint with bearer secret authentication
//! - Live configuration updates and validation-only checks
//! - GeoIP database verification
//!
//! # Example
//!
//! ```no_run
//! use clash_bridge::{bootstrap, BootstrapOptions, ConfigSource, Core, CorePaths, Result};
//!
//! fn main() -> Result<()> {
//!     let core = Core::builder(CorePaths::detect()?).build()?;
//!
//!     let options = BootstrapOptions { repair_ports: true, allow_lan: Some(false) };
//!     let config = bootstrap(&core, &ConfigSource::Default, options)?;
//!
//!     println!("controller at {}", config.general.external_controller);
//!     Ok(())
//! }
//! ```

// Public modules
pub mod bootstrap;
pub mod common;
pub mod config;
pub mod context;
pub mod controller;
pub mod engine;
pub mod ffi;
pub mod geoip;

// Re-export commonly used structures and functions for convenience
pub use bootstrap::{
    bootstrap, update_config, verify_config, BootstrapOptions, BootstrapReport, ConfigSource,
};
pub use common::{parse_socket_addr, BridgeError, Result};
pub use context::{Core, CoreBuilder, CorePaths};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
