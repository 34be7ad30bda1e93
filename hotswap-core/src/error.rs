//! Registry error types

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Lifecycle hook a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Load,
    Enable,
    Disable,
    Unload,
    ConfigChanged,
    DescriptorChanged,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::Load => "on_load",
            Hook::Enable => "on_enable",
            Hook::Disable => "on_disable",
            Hook::Unload => "on_unload",
            Hook::ConfigChanged => "on_config_changed",
            Hook::DescriptorChanged => "on_descriptor_changed",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while discovering, loading or transitioning plugins.
///
/// Every variant names the plugin it concerns, so a failure can be diagnosed
/// without the logs.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Descriptor file is missing, or the identifier cannot name a plugin directory
    #[error("Plugin '{id}' not found: no descriptor at {path}")]
    NotFound { id: String, path: PathBuf },

    /// Descriptor or config file could not be parsed
    #[error("Malformed descriptor for plugin '{id}': {reason}")]
    MalformedDescriptor { id: String, reason: String },

    /// The descriptor's entry point does not exist on disk
    #[error("Entry point of plugin '{id}' not found: {path}")]
    EntryPointMissing { id: String, path: PathBuf },

    /// Nothing provides a factory for the entry point
    #[error("No implementation found for plugin '{id}' (entry point '{entry}')")]
    NoImplementationFound { id: String, entry: String },

    /// More than one factory claims the plugin
    #[error("Ambiguous implementation for plugin '{id}': {reason}")]
    AmbiguousImplementation { id: String, reason: String },

    /// Native plugin was built against another API version
    #[error("API version mismatch for plugin '{id}': host expects {expected}, plugin has {found}")]
    ApiVersionMismatch { id: String, expected: u32, found: u32 },

    /// `on_load` failed, panicked or timed out
    #[error("Plugin '{id}' failed to initialize: {cause}")]
    InitializationFailed { id: String, cause: String },

    /// Any other hook failed, panicked or timed out
    #[error("Plugin '{id}' {hook} hook failed: {cause}")]
    HookFailed { id: String, hook: Hook, cause: String },

    #[error("Invalid state transition: plugin '{id}' is already loaded")]
    AlreadyLoaded { id: String },

    #[error("Invalid state transition: plugin '{id}' is not loaded")]
    NotLoaded { id: String },

    #[error("Invalid state transition: plugin '{id}' is already enabled")]
    AlreadyEnabled { id: String },

    #[error("Invalid state transition: plugin '{id}' is already disabled")]
    AlreadyDisabled { id: String },

    /// A mounted route is already taken
    #[error("Route '{route}' of plugin '{id}' conflicts with plugin '{existing}'")]
    MountConflict {
        id: String,
        route: String,
        existing: String,
    },

    /// Filesystem error during discovery, loading or watching
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file watcher could not be set up
    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Failed to open a native plugin library
    #[error("Failed to load plugin library for '{id}': {source}")]
    LibraryLoad {
        id: String,
        #[source]
        source: libloading::Error,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Identifier of the plugin the error concerns, if any
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::NotFound { id, .. }
            | Self::MalformedDescriptor { id, .. }
            | Self::EntryPointMissing { id, .. }
            | Self::NoImplementationFound { id, .. }
            | Self::AmbiguousImplementation { id, .. }
            | Self::ApiVersionMismatch { id, .. }
            | Self::InitializationFailed { id, .. }
            | Self::HookFailed { id, .. }
            | Self::AlreadyLoaded { id }
            | Self::NotLoaded { id }
            | Self::AlreadyEnabled { id }
            | Self::AlreadyDisabled { id }
            | Self::MountConflict { id, .. }
            | Self::LibraryLoad { id, .. } => Some(id.as_str()),
            Self::Io { .. } | Self::Watch(_) => None,
        }
    }

    /// True when an operation was rejected because its precondition on the
    /// plugin's state was not met
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyLoaded { .. }
                | Self::NotLoaded { .. }
                | Self::AlreadyEnabled { .. }
                | Self::AlreadyDisabled { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
