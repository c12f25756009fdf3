//! Configuration validator
//!
//! Semantic checks that run after YAML parsing. Port and controller address
//! problems are not errors here; the bootstrap orchestrator repairs those.

use std::collections::HashSet;

use log::warn;

use crate::config::error::{ConfigError, Result};
use crate::config::types::Config;

/// Names that always exist in the engine
pub const BUILTIN_PROXIES: [&str; 3] = ["DIRECT", "REJECT", "GLOBAL"];

/// Validate the configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let known = validate_names(config)?;

    validate_groups(config, &known)?;

    validate_rules(config, &known)?;

    Ok(())
}

/// Proxy and group names must be non-empty and unique
fn validate_names(config: &Config) -> Result<HashSet<&str>> {
    let mut known: HashSet<&str> = BUILTIN_PROXIES.iter().copied().collect();

    for (idx, proxy) in config.proxies.iter().enumerate() {
        if proxy.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                format!("proxies[{}]", idx),
                "Proxy name must not be empty".to_string(),
            ));
        }
        if !known.insert(proxy.name.as_str()) {
            return Err(ConfigError::DuplicateName("Proxy", proxy.name.clone()));
        }
    }

    for (idx, group) in config.proxy_groups.iter().enumerate() {
        if group.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                format!("proxy-groups[{}]", idx),
                "Proxy group name must not be empty".to_string(),
            ));
        }
        if !known.insert(group.name.as_str()) {
            return Err(ConfigError::DuplicateName("Proxy group", group.name.clone()));
        }
    }

    Ok(known)
}

/// Group members must exist
fn validate_groups(config: &Config, known: &HashSet<&str>) -> Result<()> {
    for group in &config.proxy_groups {
        if group.proxies.is_empty() {
            warn!("Proxy group {} has no members", group.name);
        }
        if let Some(missing) = group.proxies.iter().find(|m| !known.contains(m.as_str())) {
            return Err(ConfigError::UnknownReference(
                format!("Proxy group {}", group.name),
                missing.clone(),
            ));
        }
    }

    Ok(())
}

/// Rules must be `MATCH,TARGET` or `TYPE,PAYLOAD,TARGET[,OPTION]` with a known target
fn validate_rules(config: &Config, known: &HashSet<&str>) -> Result<()> {
    for (idx, rule) in config.rules.iter().enumerate() {
        let parts: Vec<&str> = rule.split(',').map(str::trim).collect();

        let target = match parts.as_slice() {
            [kind, target] if kind.eq_ignore_ascii_case("MATCH") || kind.eq_ignore_ascii_case("FINAL") => *target,
            [_, _, target] | [_, _, target, _] => *target,
            _ => {
                return Err(ConfigError::InvalidValue(
                    format!("rules[{}]", idx),
                    format!("[{}] error: format invalid", rule),
                ))
            }
        };

        if !known.contains(target) {
            return Err(ConfigError::UnknownReference(
                format!("rules[{}] [{}]", idx, rule),
                target.to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ProxyDef, ProxyGroup};

    fn proxy(name: &str) -> ProxyDef {
        ProxyDef {
            name: name.to_string(),
            kind: "http".to_string(),
            server: Some("127.0.0.1".to_string()),
            port: Some(8080),
            options: Default::default(),
        }
    }

    fn group(name: &str, members: &[&str]) -> ProxyGroup {
        ProxyGroup {
            name: name.to_string(),
            kind: "select".to_string(),
            proxies: members.iter().map(|m| m.to_string()).collect(),
            options: Default::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config {
            proxies: vec![proxy("a"), proxy("b")],
            proxy_groups: vec![group("g", &["a", "b", "DIRECT"])],
            rules: vec![
                "DOMAIN,example.com,g".to_string(),
                "IP-CIDR,10.0.0.0/8,DIRECT,no-resolve".to_string(),
                "MATCH,a".to_string(),
            ],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_duplicate_proxy_name() {
        let config = Config {
            proxies: vec![proxy("a"), proxy("a")],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Proxy a is the duplicate name");
    }

    #[test]
    fn test_proxy_shadowing_builtin() {
        let config = Config {
            proxies: vec![proxy("DIRECT")],
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(ConfigError::DuplicateName(_, _))));
    }

    #[test]
    fn test_group_with_unknown_member() {
        let config = Config {
            proxies: vec![proxy("a")],
            proxy_groups: vec![group("g", &["a", "missing"])],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Proxy group g: 'missing' not found");
    }

    #[test]
    fn test_group_may_reference_later_group() {
        let config = Config {
            proxies: vec![proxy("a")],
            proxy_groups: vec![group("outer", &["inner"]), group("inner", &["a"])],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_malformed_rule() {
        let config = Config {
            rules: vec!["DOMAIN".to_string()],
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidValue(_, _))));
    }

    #[test]
    fn test_rule_with_unknown_target() {
        let config = Config {
            rules: vec!["DOMAIN-SUFFIX,example.com,nowhere".to_string()],
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(ConfigError::UnknownReference(_, _))));
    }
}
