//! Change events emitted by the file watcher

use serde::Serialize;

/// What changed on disk for a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// `config.json` was written
    ConfigChanged,
    /// `plugin.json` was written
    DescriptorChanged,
}

/// A logical "plugin changed" signal. Consumed once by the registry.
///
/// `(identifier, kind)` is also the debounce key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChangeEvent {
    pub identifier: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(identifier: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }

    pub fn config(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ChangeKind::ConfigChanged)
    }

    pub fn descriptor(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ChangeKind::DescriptorChanged)
    }
}
