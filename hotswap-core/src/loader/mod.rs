//! Plugin loader - resolves an entry point to a fresh, initialized instance
//!
//! Resolution is explicit; there is no scanning of a module for types that
//! happen to implement the contract:
//!
//! - an entry point with a native library extension is opened with `libloading`
//!   and must export the single well-known factory generated by
//!   `hotswap_plugin_api::export_plugin!`
//! - any other entry point is resolved through the in-process [`FactoryCatalog`]
//!   by plugin identifier
//!
//! Claiming one identifier both ways is ambiguous and rejected.

mod catalog;
mod native;

pub use catalog::{Factory, FactoryCatalog};
pub use native::{LIBRARY_EXTENSIONS, NativeLibrary, is_library};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hotswap_plugin_api::{ConfigMap, HostContext, Plugin, PluginDescriptor, PluginInit};

use crate::descriptor::DescriptorStore;
use crate::error::{Hook, RegistryError, Result};
use crate::hooks;

/// A constructed and initialized plugin.
///
/// Field order matters: the instance is dropped before the library its code
/// lives in.
pub struct LoadedModule {
    pub instance: Box<dyn Plugin>,
    pub library: Option<NativeLibrary>,
}

/// Stateless per call: every `load` builds a new instance.
pub struct PluginLoader {
    store: DescriptorStore,
    catalog: FactoryCatalog,
    shadow_dir: PathBuf,
    hook_timeout: Option<Duration>,
    generation: AtomicU64,
}

impl PluginLoader {
    pub fn new(
        store: DescriptorStore,
        catalog: FactoryCatalog,
        shadow_dir: PathBuf,
        hook_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            catalog,
            shadow_dir,
            hook_timeout,
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve the descriptor's entry point, construct the plugin and run `on_load`.
    pub async fn load(
        &self,
        id: &str,
        descriptor: &PluginDescriptor,
        context: Arc<HostContext>,
        config: ConfigMap,
    ) -> Result<LoadedModule> {
        let entry = self.store.plugin_dir(id).join(&descriptor.entry_point);
        if !entry.exists() {
            return Err(RegistryError::EntryPointMissing {
                id: id.to_string(),
                path: entry,
            });
        }

        let init = PluginInit::new(context, descriptor.clone(), config);

        let (mut instance, library) = if is_library(&entry) {
            if self.catalog.contains(id) {
                return Err(RegistryError::AmbiguousImplementation {
                    id: id.to_string(),
                    reason: format!(
                        "both {} and a built-in factory provide this plugin",
                        entry.display()
                    ),
                });
            }

            let generation = self.generation.fetch_add(1, Ordering::Relaxed);
            let (library, create) =
                NativeLibrary::open(id, &entry, &self.shadow_dir, generation)?;
            tracing::debug!(
                plugin = %id,
                shadow = %library.shadow_path().display(),
                "Opened native plugin library"
            );
            let instance = hooks::call(id, "constructor", || create(init))
                .map_err(|cause| RegistryError::InitializationFailed {
                    id: id.to_string(),
                    cause,
                })?;
            (instance, Some(library))
        } else {
            let factory =
                self.catalog
                    .get(id)
                    .ok_or_else(|| RegistryError::NoImplementationFound {
                        id: id.to_string(),
                        entry: descriptor.entry_point.clone(),
                    })?;
            let instance = hooks::call(id, "constructor", || factory(init)).map_err(|cause| {
                RegistryError::InitializationFailed {
                    id: id.to_string(),
                    cause,
                }
            })?;
            (instance, None)
        };

        let outcome = hooks::invoke(id, Hook::Load, self.hook_timeout, instance.on_load()).await;
        if let Err(cause) = outcome {
            // Drop the instance before its library.
            drop(instance);
            drop(library);
            return Err(RegistryError::InitializationFailed {
                id: id.to_string(),
                cause,
            });
        }

        Ok(LoadedModule { instance, library })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hotswap_plugin_api::{PluginError, PluginIdentity};
    use tempfile::TempDir;

    struct Flaky {
        fail: bool,
    }

    impl From<PluginInit> for Flaky {
        fn from(init: PluginInit) -> Self {
            Flaky {
                fail: init.config_get::<bool>("fail").unwrap_or(false),
            }
        }
    }

    #[async_trait]
    impl Plugin for Flaky {
        fn identity(&self) -> PluginIdentity {
            PluginIdentity::new("flaky", "0.1.0")
        }

        async fn on_load(&mut self) -> std::result::Result<(), PluginError> {
            if self.fail {
                Err(PluginError::declined("configured to fail"))
            } else {
                Ok(())
            }
        }

        async fn on_unload(&mut self) -> std::result::Result<(), PluginError> {
            Ok(())
        }
    }

    fn setup(entry: Option<&str>) -> (TempDir, PluginLoader) {
        let dir = TempDir::new().unwrap();
        let plugin_dir = dir.path().join("flaky");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        if let Some(entry) = entry {
            std::fs::write(plugin_dir.join(entry), "").unwrap();
        }

        let mut catalog = FactoryCatalog::new();
        catalog.register_type::<Flaky>("flaky").unwrap();

        let loader = PluginLoader::new(
            DescriptorStore::new(dir.path()),
            catalog,
            dir.path().join("shadow"),
            Some(Duration::from_secs(1)),
        );
        (dir, loader)
    }

    fn config(fail: bool) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert("fail".to_string(), fail.into());
        config
    }

    #[tokio::test]
    async fn test_load_builtin() {
        let (_dir, loader) = setup(Some("main"));
        let module = loader
            .load(
                "flaky",
                &PluginDescriptor::new("flaky"),
                Arc::new(HostContext::default()),
                config(false),
            )
            .await
            .unwrap();

        assert_eq!(module.instance.identity().name, "flaky");
        assert!(module.library.is_none());
    }

    #[tokio::test]
    async fn test_load_missing_entry_point() {
        let (_dir, loader) = setup(None);
        let result = loader
            .load(
                "flaky",
                &PluginDescriptor::new("flaky"),
                Arc::new(HostContext::default()),
                config(false),
            )
            .await;
        assert!(matches!(result, Err(RegistryError::EntryPointMissing { .. })));
    }

    #[tokio::test]
    async fn test_load_without_factory() {
        let (dir, loader) = setup(None);
        let other = dir.path().join("other");
        std::fs::create_dir_all(&other).unwrap();
        std::fs::write(other.join("main"), "").unwrap();

        let result = loader
            .load(
                "other",
                &PluginDescriptor::new("other"),
                Arc::new(HostContext::default()),
                ConfigMap::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::NoImplementationFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_library_shadowed_by_builtin_is_ambiguous() {
        let (_dir, loader) = setup(Some("libflaky.so"));
        let descriptor = PluginDescriptor::new("flaky").with_entry_point("libflaky.so");

        let result = loader
            .load(
                "flaky",
                &descriptor,
                Arc::new(HostContext::default()),
                ConfigMap::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::AmbiguousImplementation { .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_on_load_is_initialization_failure() {
        let (_dir, loader) = setup(Some("main"));
        let result = loader
            .load(
                "flaky",
                &PluginDescriptor::new("flaky"),
                Arc::new(HostContext::default()),
                config(true),
            )
            .await;

        match result {
            Err(RegistryError::InitializationFailed { id, cause }) => {
                assert_eq!(id, "flaky");
                assert!(cause.contains("configured to fail"));
            }
            _ => panic!("expected InitializationFailed"),
        }
    }
}
