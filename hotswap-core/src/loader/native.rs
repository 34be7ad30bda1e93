//! Native plugin libraries
//!
//! A library is never opened from its original path. It is copied to a shadow
//! file named after the plugin and a load generation, so a rebuilt library is
//! always mapped fresh on reload instead of reusing a handle the dynamic linker
//! still caches for the old path.

use std::path::{Path, PathBuf};

use hotswap_plugin_api::{API_VERSION, API_VERSION_SYMBOL, CREATE_SYMBOL, PluginCreateFn};
use libloading::Library;

use crate::error::{RegistryError, Result};

/// File extensions treated as native plugin libraries
pub const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

/// Check whether an entry point names a native library
pub fn is_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LIBRARY_EXTENSIONS.contains(&ext))
}

/// An opened plugin library and its shadow copy.
///
/// Must outlive every instance created from it.
pub struct NativeLibrary {
    _library: Library,
    shadow_path: PathBuf,
}

impl NativeLibrary {
    /// Copy `path` into `shadow_dir`, open the copy and resolve the factory.
    pub fn open(
        id: &str,
        path: &Path,
        shadow_dir: &Path,
        generation: u64,
    ) -> Result<(Self, PluginCreateFn)> {
        std::fs::create_dir_all(shadow_dir).map_err(|e| RegistryError::io(shadow_dir, e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("so");
        let shadow_path = shadow_dir.join(format!("{}-{}.{}", id, generation, ext));
        std::fs::copy(path, &shadow_path).map_err(|e| RegistryError::io(path, e))?;

        // SAFETY: the library was placed in the plugin root by the operator and is
        // expected to follow the plugin API contract.
        let library = match unsafe { Library::new(&shadow_path) } {
            Ok(library) => library,
            Err(source) => {
                let _ = std::fs::remove_file(&shadow_path);
                return Err(RegistryError::LibraryLoad {
                    id: id.to_string(),
                    source,
                });
            }
        };

        // From here on the shadow file is removed by Drop on every error path.
        let native = Self {
            _library: library,
            shadow_path,
        };

        let create = native.resolve(id)?;
        Ok((native, create))
    }

    fn resolve(&self, id: &str) -> Result<PluginCreateFn> {
        let missing = |symbol: &[u8]| RegistryError::NoImplementationFound {
            id: id.to_string(),
            entry: String::from_utf8_lossy(symbol).into_owned(),
        };

        // SAFETY: the symbol is generated by `export_plugin!` with this signature.
        let api_version: libloading::Symbol<extern "C" fn() -> u32> =
            unsafe { self._library.get(API_VERSION_SYMBOL) }
                .map_err(|_| missing(API_VERSION_SYMBOL))?;

        let found = api_version();
        if found != API_VERSION {
            return Err(RegistryError::ApiVersionMismatch {
                id: id.to_string(),
                expected: API_VERSION,
                found,
            });
        }

        // SAFETY: as above; the copied fn pointer is only called while `self` is alive.
        let create: libloading::Symbol<PluginCreateFn> =
            unsafe { self._library.get(CREATE_SYMBOL) }.map_err(|_| missing(CREATE_SYMBOL))?;

        Ok(*create)
    }

    /// Path of the shadow copy this library was opened from
    pub fn shadow_path(&self) -> &Path {
        &self.shadow_path
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.shadow_path) {
            tracing::debug!(
                path = %self.shadow_path.display(),
                error = %e,
                "Could not remove shadow library"
            );
        }
    }
}
