//! Port repair
//!
//! Controller repair is all-or-nothing: when no replacement port can be
//! allocated the bootstrap fails. Proxy listener repair is best effort and
//! keeps the configured value when allocation fails.

use log::{info, warn};

use crate::common::{is_addr_usable, is_port_available, BridgeError, PortAllocator, Result};
use crate::config::defaults::LOOPBACK_HOST;
use crate::config::General;

/// Replace an unusable controller address with a loopback one
///
/// Returns whether the address was replaced. A replaced address always comes
/// with an empty secret.
pub fn repair_controller(general: &mut General, allocator: &dyn PortAllocator) -> Result<bool> {
    if is_addr_usable(&general.external_controller) {
        return Ok(false);
    }

    let port = allocator.allocate().map_err(BridgeError::PortAllocation)?;
    let addr = format!("{}:{}", LOOPBACK_HOST, port);

    warn!(
        "External controller address {:?} is not usable, using {} instead",
        general.external_controller, addr
    );

    general.external_controller = addr;
    general.secret.clear();
    Ok(true)
}

/// Replace unavailable proxy listener ports
///
/// `port` and `socks-port` are always checked; `mixed-port` only when it is
/// enabled. Returns the names of the settings that were changed.
pub fn repair_proxy_ports(
    general: &mut General,
    allow_lan: bool,
    allocator: &dyn PortAllocator,
) -> Vec<&'static str> {
    let mut changed = Vec::new();

    if repair_port("port", &mut general.port, allow_lan, allocator) {
        changed.push("port");
    }
    if repair_port("socks-port", &mut general.socks_port, allow_lan, allocator) {
        changed.push("socks-port");
    }
    if general.mixed_port != 0
        && repair_port("mixed-port", &mut general.mixed_port, allow_lan, allocator)
    {
        changed.push("mixed-port");
    }

    changed
}

fn repair_port(
    name: &str,
    slot: &mut u32,
    allow_lan: bool,
    allocator: &dyn PortAllocator,
) -> bool {
    if is_port_available(*slot, allow_lan) {
        return false;
    }

    match allocator.allocate() {
        Ok(port) => {
            info!("{} {} is not available, using {} instead", name, slot, port);
            *slot = u32::from(port);
            true
        }
        Err(e) => {
            warn!(
                "{} {} is not available and no replacement could be allocated: {}",
                name, slot, e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::TcpListener;

    use crate::common::OsPortAllocator;

    struct FailingAllocator;

    impl PortAllocator for FailingAllocator {
        fn allocate(&self) -> io::Result<u16> {
            Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "exhausted"))
        }
    }

    #[test]
    fn test_controller_kept_when_usable() {
        let free = crate::common::allocate_free_port().unwrap();
        let mut general = General {
            external_controller: format!("127.0.0.1:{}", free),
            secret: "s".to_string(),
            ..General::default()
        };

        assert!(!repair_controller(&mut general, &OsPortAllocator).unwrap());
        assert_eq!(general.secret, "s");
    }

    #[test]
    fn test_controller_repaired_and_secret_cleared() {
        let mut general = General {
            external_controller: "localhost:99999".to_string(),
            secret: "s".to_string(),
            ..General::default()
        };

        assert!(repair_controller(&mut general, &OsPortAllocator).unwrap());
        assert!(general.external_controller.starts_with("127.0.0.1:"));
        assert!(general.secret.is_empty());
    }

    #[test]
    fn test_controller_allocation_failure_is_fatal() {
        let mut general = General::default();
        let err = repair_controller(&mut general, &FailingAllocator).unwrap_err();
        assert!(matches!(err, BridgeError::PortAllocation(_)));
        assert!(general.external_controller.is_empty());
    }

    #[test]
    fn test_busy_port_replaced() {
        let busy = TcpListener::bind("127.0.0.1:0").unwrap();
        let busy_port = u32::from(busy.local_addr().unwrap().port());
        let mut general = General {
            port: busy_port,
            socks_port: u32::from(crate::common::allocate_free_port().unwrap()),
            ..General::default()
        };

        let changed = repair_proxy_ports(&mut general, false, &OsPortAllocator);
        assert!(changed.contains(&"port"));
        assert_ne!(general.port, busy_port);
    }

    #[test]
    fn test_proxy_port_allocation_failure_keeps_value() {
        let mut general = General { port: 0, socks_port: 65535, ..General::default() };

        let changed = repair_proxy_ports(&mut general, false, &FailingAllocator);
        assert!(changed.is_empty());
        assert_eq!(general.port, 0);
        assert_eq!(general.socks_port, 65535);
    }

    #[test]
    fn test_disabled_mixed_port_left_alone() {
        let mut general = General::default();
        repair_proxy_ports(&mut general, false, &OsPortAllocator);
        assert_eq!(general.mixed_port, 0);
        assert_ne!(general.port, 0);
    }
}
