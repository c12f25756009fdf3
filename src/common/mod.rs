//! Common module
//!
//! This module contains shared errors, logging setup and network utilities used throughout the crate.

pub mod error;
pub mod log;
pub mod net;

// Re-export commonly used types and functions
pub use self::error::{BridgeError, Result, NO_PROXY_MESSAGE};
pub use self::log::init_logger;
pub use self::net::{
    allocate_free_port, is_addr_usable, is_addr_valid, is_port_available, parse_socket_addr,
    OsPortAllocator, PortAllocator, PortScope,
};
