//! GeoIP database verification
//!
//! Only checks that the country database opens and answers a lookup; routing
//! decisions based on it belong to the engine.

use std::net::IpAddr;
use std::path::Path;

use log::{debug, warn};
use maxminddb::{geoip2, Reader};

use crate::common::{BridgeError, Result};
use crate::config::defaults::GEOIP_TEST_IP;

/// Country lookups against a GeoIP database
pub trait GeoIpReader {
    /// ISO country code for `ip`, `None` when the record carries none
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>>;
}

/// MaxMind DB backed reader
pub struct MaxMindReader {
    reader: Reader<Vec<u8>>,
}

impl MaxMindReader {
    /// Open a `.mmdb` file
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path)
            .map_err(|e| BridgeError::Other(format!("failed to open {}: {}", path.display(), e)))?;
        Ok(Self { reader })
    }
}

impl GeoIpReader for MaxMindReader {
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>> {
        let record: geoip2::Country = self
            .reader
            .lookup(ip)
            .map_err(|e| BridgeError::Other(format!("lookup of {} failed: {}", ip, e)))?;

        Ok(record
            .country
            .and_then(|country| country.iso_code)
            .map(str::to_string))
    }
}

/// Check that a reader resolves the well-known test address
pub fn verify_reader(reader: &dyn GeoIpReader) -> bool {
    let ip: IpAddr = match GEOIP_TEST_IP.parse() {
        Ok(ip) => ip,
        Err(_) => return false,
    };

    match reader.lookup_country(ip) {
        Ok(country) => {
            debug!("GeoIP lookup of {} returned {:?}", ip, country);
            true
        }
        Err(e) => {
            warn!("mmdb lookup fail: {}", e);
            false
        }
    }
}

/// Check that the database at `path` opens and answers a lookup
pub fn verify_database(path: &Path) -> bool {
    match MaxMindReader::open(path) {
        Ok(reader) => verify_reader(&reader),
        Err(e) => {
            warn!("mmdb fail: {}", e);
            false
        }
    }
}
