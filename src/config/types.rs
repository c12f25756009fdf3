//! Configuration types
//!
//! This module contains the configuration data model shared by the loader,
//! the bootstrap orchestrator, the engine and the control endpoint.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::defaults;
use crate::config::error::ConfigError;

/// Proxy routing mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Mode {
    /// Route by rules
    #[default]
    Rule,
    /// Send everything through the global group
    Global,
    /// Connect directly
    Direct,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Rule => write!(f, "rule"),
            Mode::Global => write!(f, "global"),
            Mode::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "global" => Ok(Self::Global),
            "direct" => Ok(Self::Direct),
            _ => Err(ConfigError::InvalidValue(
                "mode".to_string(),
                format!("Invalid mode: {}. Valid values are: rule, global, direct", s),
            )),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Engine log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Silent,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Silent => write!(f, "silent"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "silent" => Ok(Self::Silent),
            _ => Err(ConfigError::InvalidValue(
                "log-level".to_string(),
                format!("Invalid log level: {}. Valid values are: debug, info, warning, error, silent", s),
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, <LogLevel as TryFrom<String>>::Error> {
        value.parse()
    }
}

/// Treat an explicit YAML `null` the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept any YAML scalar as a string (`secret: 123456`); `null` is empty
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or scalar value")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<String, D::Error> {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}

/// General (top-level) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct General {
    /// HTTP proxy listen port (0 when unset)
    pub port: u32,

    /// SOCKS listen port (0 when unset)
    pub socks_port: u32,

    /// Transparent proxy port (0 when unset)
    pub redir_port: u32,

    /// Combined HTTP+SOCKS port (0 disables it)
    pub mixed_port: u32,

    /// Whether listeners accept connections from other hosts
    pub allow_lan: bool,

    /// Bind address used when `allow_lan` is set
    #[serde(deserialize_with = "scalar_as_string")]
    pub bind_address: String,

    pub mode: Mode,

    pub log_level: LogLevel,

    pub ipv6: bool,

    /// Control endpoint address (`host:port`)
    #[serde(deserialize_with = "scalar_as_string")]
    pub external_controller: String,

    /// Directory with the dashboard assets, relative to the home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ui: Option<String>,

    /// Bearer secret for the control endpoint; empty disables authentication
    #[serde(deserialize_with = "scalar_as_string")]
    pub secret: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            port: 0,
            socks_port: 0,
            redir_port: 0,
            mixed_port: 0,
            allow_lan: false,
            bind_address: defaults::bind_address(),
            mode: defaults::mode(),
            log_level: defaults::log_level(),
            ipv6: false,
            external_controller: String::new(),
            external_ui: None,
            secret: String::new(),
        }
    }
}

/// A single outbound proxy definition
///
/// Only the fields this crate reasons about are typed; everything else is
/// kept opaque for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyDef {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Protocol specific options
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_yml::Value>,
}

/// A named group of proxies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyGroup {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Member proxy or group names
    #[serde(default, deserialize_with = "null_as_default")]
    pub proxies: Vec<String>,

    #[serde(flatten)]
    pub options: BTreeMap<String, serde_yml::Value>,
}

/// Parsed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub general: General,

    #[serde(default, alias = "Proxy", deserialize_with = "null_as_default")]
    pub proxies: Vec<ProxyDef>,

    #[serde(default, rename = "proxy-groups", alias = "Proxy Group", deserialize_with = "null_as_default")]
    pub proxy_groups: Vec<ProxyGroup>,

    #[serde(default, alias = "Rule", deserialize_with = "null_as_default")]
    pub rules: Vec<String>,
}

impl Config {
    /// Whether at least one proxy is defined
    pub fn has_proxies(&self) -> bool {
        !self.proxies.is_empty()
    }

    /// Names of all defined proxies in declaration order
    pub fn proxy_names(&self) -> impl Iterator<Item = &str> {
        self.proxies.iter().map(|p| p.name.as_str())
    }

    /// General settings as exposed to hosts and the control endpoint
    pub fn settings(&self) -> GeneralSettings {
        GeneralSettings::from(&self.general)
    }
}

/// Public view of the general settings
///
/// The controller address and secret are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralSettings {
    pub port: u32,
    pub socks_port: u32,
    pub redir_port: u32,
    pub mixed_port: u32,
    pub allow_lan: bool,
    pub bind_address: String,
    pub mode: Mode,
    pub log_level: LogLevel,
    pub ipv6: bool,
}

impl From<&General> for GeneralSettings {
    fn from(general: &General) -> Self {
        Self {
            port: general.port,
            socks_port: general.socks_port,
            redir_port: general.redir_port,
            mixed_port: general.mixed_port,
            allow_lan: general.allow_lan,
            bind_address: general.bind_address.clone(),
            mode: general.mode,
            log_level: general.log_level,
            ipv6: general.ipv6,
        }
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self::from(&General::default())
    }
}

/// Partial update of the general settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl GeneralPatch {
    /// Whether the patch carries no values
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch and return the names of the fields that changed
    pub fn apply_to(&self, general: &mut General) -> Vec<&'static str> {
        let mut changed = Vec::new();

        fn set<T: PartialEq + Copy>(slot: &mut T, value: Option<T>, name: &'static str, changed: &mut Vec<&'static str>) {
            if let Some(value) = value {
                if *slot != value {
                    *slot = value;
                    changed.push(name);
                }
            }
        }

        set(&mut general.port, self.port, "port", &mut changed);
        set(&mut general.socks_port, self.socks_port, "socks-port", &mut changed);
        set(&mut general.mixed_port, self.mixed_port, "mixed-port", &mut changed);
        set(&mut general.allow_lan, self.allow_lan, "allow-lan", &mut changed);
        set(&mut general.mode, self.mode, "mode", &mut changed);
        set(&mut general.log_level, self.log_level, "log-level", &mut changed);

        changed
    }
}
