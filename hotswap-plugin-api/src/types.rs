//! Plugin types and metadata structures

use serde::{Deserialize, Serialize};

/// Runtime configuration of a plugin: an opaque key/value mapping.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Default entry point when a descriptor omits `main`.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Stable name and version of a plugin implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
    /// Plugin name
    pub name: String,
    /// Plugin version (semver)
    pub version: String,
}

impl PluginIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Immutable snapshot of a plugin's on-disk descriptor (`plugin.json`).
///
/// A reload produces a fresh descriptor; existing ones are never mutated in place
/// by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Directory name of the plugin, its unique key. Not read from the file.
    #[serde(default, skip_deserializing)]
    pub identifier: String,
    /// Entry point relative to the plugin directory
    #[serde(rename = "main", default = "default_entry_point")]
    pub entry_point: String,
    /// Whether the host enables the plugin right after loading it at startup
    #[serde(rename = "enabled", default = "default_enabled")]
    pub enabled_by_default: bool,
    /// Config payload merged into the runtime config at load time
    #[serde(rename = "config", default)]
    pub embedded_config: ConfigMap,
    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Plugin author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Any other keys in the descriptor, kept verbatim
    #[serde(flatten)]
    pub extra: ConfigMap,
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

fn default_enabled() -> bool {
    true
}

impl PluginDescriptor {
    /// A descriptor with every optional field at its default
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            entry_point: default_entry_point(),
            enabled_by_default: true,
            embedded_config: ConfigMap::new(),
            name: None,
            version: None,
            description: None,
            author: None,
            extra: ConfigMap::new(),
        }
    }

    /// Builder: set the entry point
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Builder: set the embedded config
    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.embedded_config = config;
        self
    }
}

/// Shallow merge: keys of `patch` overwrite, all other keys of `target` are kept.
pub fn merge_config(target: &mut ConfigMap, patch: ConfigMap) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}
