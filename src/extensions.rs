//! API extensions and the per-deployment extension registry.
//!
//! A deployment enables a subset of the optional API capabilities plus
//! free-form add-ons (e.g. tile rendering). The registry is built once from
//! configuration before any request is served and is read-only afterwards,
//! so it can be shared across concurrent request handling without locking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Optional API capabilities that can be toggled per deployment.
///
/// This is a closed enumeration: the set of core extensions is fixed at
/// build time. Deployment-specific capabilities outside it are add-ons,
/// carried by name on the [`ExtensionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    /// Result-context envelope on search responses.
    Context,
    /// Field selection (include/exclude) on search results.
    Fields,
    /// Property filtering on search requests.
    Query,
    /// Result ordering on search requests.
    Sort,
    /// Write operations (create/update/delete).
    Transaction,
}

impl Extension {
    /// All core extensions, in canonical order.
    pub const ALL: &'static [Extension] = &[
        Extension::Context,
        Extension::Fields,
        Extension::Query,
        Extension::Sort,
        Extension::Transaction,
    ];

    /// Parse an extension name.
    ///
    /// Returns `None` for unknown names (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "context" => Some(Extension::Context),
            "fields" => Some(Extension::Fields),
            "query" => Some(Extension::Query),
            "sort" => Some(Extension::Sort),
            "transaction" => Some(Extension::Transaction),
            _ => None,
        }
    }

    /// Returns the configuration name for this extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Context => "context",
            Extension::Fields => "fields",
            Extension::Query => "query",
            Extension::Sort => "sort",
            Extension::Transaction => "transaction",
        }
    }
}

/// Deployment configuration consumed once at startup.
///
/// Typically deserialized from a JSON file; see [`crate::load_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Core extensions to enable, by name.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Free-form add-on capability names (e.g. "tiles").
    #[serde(default)]
    pub add_ons: Vec<String>,
    /// Dotted property paths returned when a client does not select fields.
    #[serde(default)]
    pub default_includes: Vec<String>,
}

/// The set of capabilities enabled for one deployment.
///
/// Constructed once from [`DeploymentConfig`] before the process accepts
/// requests, then treated as read-only. Request definitions are compiled
/// against it; nothing in this crate mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    enabled: BTreeSet<Extension>,
    add_ons: BTreeSet<String>,
    default_includes: Vec<String>,
}

impl ExtensionRegistry {
    /// Build a registry from deployment configuration.
    ///
    /// # Errors
    ///
    /// Unknown extension names and add-ons that shadow a core extension
    /// name are configuration errors; the caller should abort startup.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self, ConfigError> {
        let mut enabled = BTreeSet::new();
        for name in &config.extensions {
            let extension =
                Extension::parse(name).ok_or_else(|| ConfigError::UnknownExtension {
                    name: name.clone(),
                })?;
            enabled.insert(extension);
        }

        let mut add_ons = BTreeSet::new();
        for name in &config.add_ons {
            if Extension::parse(name).is_some() {
                return Err(ConfigError::ConflictingAddOn { name: name.clone() });
            }
            add_ons.insert(name.clone());
        }

        // First occurrence wins; order is part of the include-set contract.
        let mut default_includes = Vec::new();
        for path in &config.default_includes {
            if !default_includes.contains(path) {
                default_includes.push(path.clone());
            }
        }

        Ok(Self {
            enabled,
            add_ons,
            default_includes,
        })
    }

    /// Registry with every core extension enabled and no add-ons.
    pub fn with_all_extensions() -> Self {
        Self {
            enabled: Extension::ALL.iter().copied().collect(),
            add_ons: BTreeSet::new(),
            default_includes: Vec::new(),
        }
    }

    /// Registry with nothing enabled.
    pub fn empty() -> Self {
        Self {
            enabled: BTreeSet::new(),
            add_ons: BTreeSet::new(),
            default_includes: Vec::new(),
        }
    }

    /// Whether a core extension is enabled.
    pub fn is_enabled(&self, extension: Extension) -> bool {
        self.enabled.contains(&extension)
    }

    /// Whether a named add-on is enabled.
    pub fn has_add_on(&self, name: &str) -> bool {
        self.add_ons.contains(name)
    }

    /// Enabled add-on names, sorted.
    pub fn add_ons(&self) -> impl Iterator<Item = &str> {
        self.add_ons.iter().map(String::as_str)
    }

    /// Property paths returned when a client does not select fields.
    pub fn default_includes(&self) -> &[String] {
        &self.default_includes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parse_valid() {
        assert_eq!(Extension::parse("query"), Some(Extension::Query));
        assert_eq!(Extension::parse("sort"), Some(Extension::Sort));
        assert_eq!(Extension::parse("transaction"), Some(Extension::Transaction));
    }

    #[test]
    fn extension_parse_invalid() {
        assert_eq!(Extension::parse("tiles"), None);
        assert_eq!(Extension::parse("Query"), None);
        assert_eq!(Extension::parse(""), None);
    }

    #[test]
    fn extension_round_trips_through_name() {
        for extension in Extension::ALL {
            assert_eq!(Extension::parse(extension.as_str()), Some(*extension));
        }
    }

    #[test]
    fn registry_enables_configured_extensions() {
        let config = DeploymentConfig {
            extensions: vec!["query".into(), "sort".into()],
            ..Default::default()
        };
        let registry = ExtensionRegistry::from_config(&config).unwrap();

        assert!(registry.is_enabled(Extension::Query));
        assert!(registry.is_enabled(Extension::Sort));
        assert!(!registry.is_enabled(Extension::Fields));
        assert!(!registry.is_enabled(Extension::Transaction));
    }

    #[test]
    fn registry_rejects_unknown_extension() {
        let config = DeploymentConfig {
            extensions: vec!["query".into(), "tiles".into()],
            ..Default::default()
        };
        let result = ExtensionRegistry::from_config(&config);

        assert!(matches!(
            result,
            Err(ConfigError::UnknownExtension { name }) if name == "tiles"
        ));
    }

    #[test]
    fn registry_rejects_add_on_shadowing_extension() {
        let config = DeploymentConfig {
            add_ons: vec!["tiles".into(), "sort".into()],
            ..Default::default()
        };
        let result = ExtensionRegistry::from_config(&config);

        assert!(matches!(
            result,
            Err(ConfigError::ConflictingAddOn { name }) if name == "sort"
        ));
    }

    #[test]
    fn registry_tracks_add_ons() {
        let config = DeploymentConfig {
            add_ons: vec!["tiles".into()],
            ..Default::default()
        };
        let registry = ExtensionRegistry::from_config(&config).unwrap();

        assert!(registry.has_add_on("tiles"));
        assert!(!registry.has_add_on("mosaic"));
        assert_eq!(registry.add_ons().collect::<Vec<_>>(), vec!["tiles"]);
    }

    #[test]
    fn default_includes_keep_order_and_drop_repeats() {
        let config = DeploymentConfig {
            default_includes: vec![
                "id".into(),
                "properties.datetime".into(),
                "id".into(),
                "geometry".into(),
            ],
            ..Default::default()
        };
        let registry = ExtensionRegistry::from_config(&config).unwrap();

        assert_eq!(
            registry.default_includes(),
            ["id", "properties.datetime", "geometry"]
        );
    }

    #[test]
    fn with_all_extensions_enables_everything() {
        let registry = ExtensionRegistry::with_all_extensions();
        for extension in Extension::ALL {
            assert!(registry.is_enabled(*extension));
        }
    }

    #[test]
    fn empty_registry_enables_nothing() {
        let registry = ExtensionRegistry::empty();
        for extension in Extension::ALL {
            assert!(!registry.is_enabled(*extension));
        }
        assert!(registry.default_includes().is_empty());
    }

    #[test]
    fn config_deserializes_with_missing_keys() {
        let config: DeploymentConfig = serde_json::from_str(r#"{"extensions":["query"]}"#).unwrap();
        assert_eq!(config.extensions, ["query"]);
        assert!(config.add_ons.is_empty());
        assert!(config.default_includes.is_empty());
    }
}
