//! Network utility functions
//!
//! Address validation, port probing and ephemeral port allocation used while
//! bootstrapping a configuration.
//!
//! Two ranges coexist here and are kept apart on purpose: an address is valid
//! when its port lies in `1..=65534` by way of an exclusive `0 < p < 65535`
//! check, while the prober works on the inclusive range `[1, 65534]`. Both
//! reject 65535; only the prober short-circuits without touching a socket.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, TcpListener, ToSocketAddrs};
use std::str::FromStr;

use log::{debug, trace};
use socket2::{Domain, Protocol, Socket, Type};

use super::error::{BridgeError, Result};

/// Lowest port the prober will try to bind
pub const MIN_PROBE_PORT: u32 = 1;

/// Highest port the prober will try to bind
pub const MAX_PROBE_PORT: u32 = 65534;

/// Exclusive upper bound for the port of a valid address
const ADDR_PORT_LIMIT: i64 = 65535;

/// Where a probe listener is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortScope {
    /// 127.0.0.1 only
    Loopback,
    /// Every interface (dual-stack when IPv6 is available)
    AllInterfaces,
}

impl PortScope {
    /// Scope matching an `allow-lan` setting
    pub fn from_allow_lan(allow_lan: bool) -> Self {
        if allow_lan {
            Self::AllInterfaces
        } else {
            Self::Loopback
        }
    }
}

/// Parse a socket address
///
/// Accepts the `:port` shorthand for "all interfaces" used by controller
/// addresses in addition to everything `ToSocketAddrs` resolves.
///
/// # Arguments
///
/// * `addr` - The address string to parse
///
/// # Returns
///
/// The parsed `SocketAddr`
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    let normalized = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    // Try direct parsing first
    if let Ok(socket_addr) = SocketAddr::from_str(&normalized) {
        return Ok(socket_addr);
    }

    // Try using ToSocketAddrs trait
    match normalized.to_socket_addrs() {
        Ok(mut addrs) => addrs
            .next()
            .ok_or_else(|| BridgeError::Other(format!("Failed to parse address: {}", addr))),
        Err(e) => Err(BridgeError::Other(format!("Failed to parse address {}: {}", addr, e))),
    }
}

/// Check whether an address string carries a usable port
///
/// The port is the text after the last `:`; it must parse as a decimal
/// integer with `0 < port < 65535`. Nothing is bound.
pub fn is_addr_valid(addr: &str) -> bool {
    address_port(addr).is_some()
}

/// Check an address string and probe its port on loopback
///
/// An address that is syntactically valid but whose port cannot be bound on
/// 127.0.0.1 right now is treated as invalid.
pub fn is_addr_usable(addr: &str) -> bool {
    match address_port(addr) {
        Some(port) => is_port_available(port, false),
        None => false,
    }
}

fn address_port(addr: &str) -> Option<u32> {
    if addr.is_empty() {
        return None;
    }

    let candidate = addr.rsplit(':').next()?;
    let port = candidate.parse::<i64>().ok()?;
    if port > 0 && port < ADDR_PORT_LIMIT {
        u32::try_from(port).ok()
    } else {
        None
    }
}

/// Check whether a port can be bound right now
///
/// Ports outside `[1, 65534]` are rejected without a syscall. Otherwise a
/// stream listener is opened on `127.0.0.1` (or on every interface when
/// `allow_lan` is set) and closed again immediately. The answer can be stale
/// by the time a real listener binds the port.
pub fn is_port_available(port: u32, allow_lan: bool) -> bool {
    if !(MIN_PROBE_PORT..=MAX_PROBE_PORT).contains(&port) {
        trace!("Port {} is outside the probe range", port);
        return false;
    }

    let Ok(port) = u16::try_from(port) else {
        return false;
    };

    let result = match PortScope::from_allow_lan(allow_lan) {
        PortScope::Loopback => probe_bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port).into()),
        PortScope::AllInterfaces => {
            match probe_bind(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0).into()) {
                Err(e) if !is_conflict(&e) => {
                    // No usable IPv6 stack; fall back to the IPv4 wildcard
                    probe_bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())
                }
                other => other,
            }
        }
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Port {} is not available (allow_lan: {}): {}", port, allow_lan, e);
            false
        }
    }
}

fn is_conflict(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied)
}

/// Bind and listen, then release the socket on drop
fn probe_bind(addr: SocketAddr) -> io::Result<()> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    Ok(())
}

/// Ask the operating system for a free ephemeral port
///
/// Binds loopback port 0, reads back the assigned port and releases it.
pub fn allocate_free_port() -> io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    let port = listener.local_addr()?.port();
    trace!("Operating system assigned free port {}", port);
    Ok(port)
}

/// Source of replacement ports
///
/// Allocation failures are returned as-is; retry policy belongs to the caller.
pub trait PortAllocator: Send + Sync {
    /// Obtain a port that is free at the time of the call
    fn allocate(&self) -> io::Result<u16>;
}

/// Allocator backed by the operating system's ephemeral port range
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPortAllocator;

impl PortAllocator for OsPortAllocator {
    fn allocate(&self) -> io::Result<u16> {
        allocate_free_port()
    }
}
