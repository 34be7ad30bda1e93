//! Descriptor store - reads plugin descriptors and config files from disk
//!
//! Layout under the plugin root:
//!
//! ```text
//! <root>/
//!   echo/
//!     plugin.json   descriptor: main, enabled, config, name, version, ...
//!     config.json   optional runtime config, watched independently
//!     main          entry point named by `main`
//! ```

use std::path::{Path, PathBuf};

use hotswap_plugin_api::{ConfigMap, PluginDescriptor};

use crate::error::{RegistryError, Result};

/// Descriptor file name inside a plugin directory
pub const DESCRIPTOR_FILE: &str = "plugin.json";

/// Runtime config file name inside a plugin directory
pub const CONFIG_FILE: &str = "config.json";

/// Directory names starting with these are never plugins
pub const RESERVED_PREFIXES: &[&str] = &["__", "."];

/// Check whether a directory name is reserved
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Whether `id` can name a plugin directory directly under the root
pub fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && !is_reserved(id)
        && !id.contains(['/', '\\'])
        && Path::new(id).components().count() == 1
}

/// Stateless reader over a plugin root directory
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    root: PathBuf,
}

impl DescriptorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory plugins are discovered under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a plugin
    pub fn plugin_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// List identifiers of plugin directories.
    ///
    /// A plugin directory is a non-reserved subdirectory containing a descriptor
    /// file. Order follows the directory listing and carries no meaning. Entries
    /// that cannot be inspected are skipped; only failure to list the root itself is
    /// an error.
    pub fn discover(&self) -> Result<Vec<String>> {
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| RegistryError::io(&self.root, e))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %self.root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if is_reserved(name) || !path.is_dir() {
                continue;
            }

            if path.join(DESCRIPTOR_FILE).is_file() {
                found.push(name.to_string());
            }
        }

        Ok(found)
    }

    /// Read and parse a plugin's descriptor
    pub fn read(&self, id: &str) -> Result<PluginDescriptor> {
        let path = self.descriptor_path(id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound {
                    id: id.to_string(),
                    path,
                });
            }
            Err(e) => return Err(RegistryError::io(path, e)),
        };

        let mut descriptor: PluginDescriptor =
            serde_json::from_str(&content).map_err(|e| RegistryError::MalformedDescriptor {
                id: id.to_string(),
                reason: format!("{}: {}", DESCRIPTOR_FILE, e),
            })?;

        if descriptor.entry_point.trim().is_empty() {
            return Err(RegistryError::MalformedDescriptor {
                id: id.to_string(),
                reason: "entry point 'main' is empty".to_string(),
            });
        }

        // `identifier` is the directory name; a key of that name in the file is dropped.
        descriptor.extra.remove("identifier");
        descriptor.identifier = id.to_string();
        Ok(descriptor)
    }

    /// Read a plugin's sibling config file.
    ///
    /// Returns `Ok(None)` when the plugin has no config file.
    pub fn read_config(&self, id: &str) -> Result<Option<ConfigMap>> {
        let path = self.plugin_path(id)?.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::io(path, e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RegistryError::MalformedDescriptor {
                id: id.to_string(),
                reason: format!("{}: {}", CONFIG_FILE, e),
            })
    }

    fn descriptor_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.plugin_path(id)?.join(DESCRIPTOR_FILE))
    }

    /// Directory of a plugin, refusing identifiers that could escape the root
    fn plugin_path(&self, id: &str) -> Result<PathBuf> {
        if is_valid_identifier(id) {
            Ok(self.plugin_dir(id))
        } else {
            Err(RegistryError::NotFound {
                id: id.to_string(),
                path: self.root.join(id),
            })
        }
    }
}
