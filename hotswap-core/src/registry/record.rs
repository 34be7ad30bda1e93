//! Per-plugin runtime records and their externally visible status

use std::fmt;

use hotswap_plugin_api::{ConfigMap, PluginDescriptor, PluginIdentity};
use serde::Serialize;

use crate::loader::LoadedModule;

/// Lifecycle state of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// No record exists
    Unloaded,
    /// Record exists, not enabled
    Loaded,
    /// Record exists and is enabled
    Enabled,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginState::Unloaded => write!(f, "unloaded"),
            PluginState::Loaded => write!(f, "loaded"),
            PluginState::Enabled => write!(f, "enabled"),
        }
    }
}

/// Runtime state of one loaded plugin. Only the registry touches it.
pub(crate) struct PluginRecord {
    pub(crate) module: LoadedModule,
    pub(crate) identity: PluginIdentity,
    pub(crate) metadata: PluginDescriptor,
    pub(crate) config: ConfigMap,
    pub(crate) is_enabled: bool,
}

impl PluginRecord {
    pub(crate) fn state(&self) -> PluginState {
        if self.is_enabled {
            PluginState::Enabled
        } else {
            PluginState::Loaded
        }
    }

    pub(crate) fn status(&self, identifier: &str) -> PluginStatus {
        PluginStatus {
            identifier: identifier.to_string(),
            state: self.state(),
            is_enabled: self.is_enabled,
            identity: Some(self.identity.clone()),
            metadata: Some(self.metadata.clone()),
            config: Some(self.config.clone()),
        }
    }
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginStatus {
    pub identifier: String,
    pub state: PluginState,
    pub is_enabled: bool,
    /// Implementation identity, only known while loaded
    pub identity: Option<PluginIdentity>,
    /// Descriptor, `None` if unloaded and the descriptor cannot be read
    pub metadata: Option<PluginDescriptor>,
    /// Runtime config, only present while loaded
    pub config: Option<ConfigMap>,
}

impl PluginStatus {
    pub(crate) fn unloaded(identifier: &str, metadata: Option<PluginDescriptor>) -> Self {
        Self {
            identifier: identifier.to_string(),
            state: PluginState::Unloaded,
            is_enabled: false,
            identity: None,
            metadata,
            config: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state != PluginState::Unloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PluginState::Unloaded.to_string(), "unloaded");
        assert_eq!(PluginState::Enabled.to_string(), "enabled");
    }

    #[test]
    fn test_unloaded_status_serializes_null_metadata() {
        let status = PluginStatus::unloaded("ghost", None);
        assert!(!status.is_loaded());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "unloaded");
        assert_eq!(json["is_enabled"], false);
        assert!(json["metadata"].is_null());
    }
}
