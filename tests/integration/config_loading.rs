//! Configuration loading from files
//!
//! Tests for the YAML loader against real files on disk.

use std::fs;

use clash_bridge::config::{ConfigError, ConfigLoader, LogLevel, Mode, YamlLoader};
use clash_bridge::{verify_config, BridgeError};

#[test]
fn test_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
port: 7890
socks-port: 7891
mixed-port: 7893
allow-lan: false
bind-address: "*"
mode: rule
log-level: silent
ipv6: true
external-controller: 127.0.0.1:9090
external-ui: dashboard
secret: ""
proxies:
  - name: "ss1"
    type: ss
    server: server
    port: 443
    cipher: chacha20-ietf-poly1305
    password: "password"
  - name: "vmess1"
    type: vmess
    server: server
    port: 443
    uuid: 2a8e7b4c-77c6-4f21-8a3e-8a1c1b4d5e6f
    alterId: 0
proxy-groups:
  - name: "select"
    type: select
    proxies: ["ss1", "vmess1", DIRECT]
  - name: "fallback"
    type: fallback
    proxies: ["select", "ss1"]
    url: 'http://www.gstatic.com/generate_204'
    interval: 300
rules:
  - DOMAIN-SUFFIX,google.com,select
  - IP-CIDR,127.0.0.0/8,DIRECT,no-resolve
  - GEOIP,CN,DIRECT
  - MATCH,fallback
"#,
    )
    .expect("Failed to write config file");

    let config = YamlLoader::new().parse_path(&path).expect("Failed to load configuration");

    assert_eq!(config.general.mixed_port, 7893);
    assert_eq!(config.general.mode, Mode::Rule);
    assert_eq!(config.general.log_level, LogLevel::Silent);
    assert_eq!(config.general.external_ui.as_deref(), Some("dashboard"));
    assert!(config.general.ipv6);
    assert_eq!(config.proxy_names().collect::<Vec<_>>(), vec!["ss1", "vmess1"]);
    assert_eq!(config.proxy_groups.len(), 2);
    assert_eq!(config.rules.len(), 4);

    // The public view never carries controller credentials
    let settings = serde_json::to_value(config.settings()).unwrap();
    assert!(settings.get("external-controller").is_none());
    assert!(settings.get("secret").is_none());
}

#[test]
fn test_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "\n\n").unwrap();

    let err = YamlLoader::new().parse_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Empty(Some(_))));
    assert!(err.to_string().contains("is empty"));
}

#[test]
fn test_validation_errors() {
    let loader = YamlLoader::new();

    let err = loader
        .parse_bytes(b"proxies:\n  - { name: a, type: ss }\n  - { name: a, type: ss }\n")
        .unwrap_err();
    assert_eq!(err.to_string(), "Proxy a is the duplicate name");

    let err = loader
        .parse_bytes(b"proxies:\n  - { name: a, type: ss }\nrules:\n  - DOMAIN,example.com,nowhere\n")
        .unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn test_verify_messages() {
    let loader = YamlLoader::new();

    let err = verify_config(&loader, b"mode: rule\n").unwrap_err();
    assert!(matches!(err, BridgeError::NoProxies));

    let err = verify_config(&loader, b"mode: [\n").unwrap_err();
    assert!(matches!(err, BridgeError::Config(ConfigError::ParseError(_))));
}
