//! PluginRegistry - owns plugin records and serializes their lifecycle
//!
//! Every lifecycle operation holds its plugin's lock for its whole duration,
//! including across hook awaits. Operations on one identifier run one at a time
//! in submission order (`tokio::sync::Mutex` is fair); operations on different
//! identifiers never wait for each other.

mod changes;
mod record;

pub use record::{PluginState, PluginStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hotswap_plugin_api::{ConfigMap, HostContext, HttpMethod, merge_config};

use crate::descriptor::{DescriptorStore, is_valid_identifier};
use crate::error::{Hook, RegistryError, Result};
use crate::events::{ChangeEvent, ChangeKind};
use crate::hooks;
use crate::loader::{FactoryCatalog, PluginLoader};
use crate::mounts::{MountTable, MountedRoute};
use record::PluginRecord;

/// Default bound on a single hook invocation
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`PluginRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory plugins are discovered under
    pub plugin_root: PathBuf,
    /// Bound on every hook call; `None` waits forever
    pub hook_timeout: Option<Duration>,
    /// Where native libraries are copied before being opened
    pub shadow_dir: PathBuf,
}

impl RegistryConfig {
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            ..Default::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            plugin_root: hotswap_paths::config_dir().join("plugins"),
            hook_timeout: Some(DEFAULT_HOOK_TIMEOUT),
            shadow_dir: hotswap_paths::shadow_dir(),
        }
    }
}

/// Outcome of [`PluginRegistry::load_all`]
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub enabled: Vec<String>,
    pub failed: Vec<(String, RegistryError)>,
}

/// Lock and last published status of one identifier
#[derive(Default)]
struct Slot {
    record: tokio::sync::Mutex<Option<PluginRecord>>,
    /// Status as of the last finished operation; readable while one is in flight
    published: Mutex<Option<PluginStatus>>,
}

impl Slot {
    fn publish(&self, id: &str, record: &Option<PluginRecord>) {
        let status = record.as_ref().map(|current| current.status(id));
        *self.published.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn published(&self) -> Option<PluginStatus> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

type SlotRef = Arc<Slot>;
type RecordGuard<'a> = tokio::sync::MutexGuard<'a, Option<PluginRecord>>;

/// The authoritative map of plugin identifier to runtime record
pub struct PluginRegistry {
    store: DescriptorStore,
    loader: PluginLoader,
    context: Arc<HostContext>,
    hook_timeout: Option<Duration>,
    /// One slot per identifier that is loaded or has an operation in flight.
    /// New holders only ever clone a slot out of this map, so two callers for
    /// the same identifier always contend on the same lock.
    slots: Mutex<HashMap<String, SlotRef>>,
    mounts: Mutex<MountTable>,
}

impl PluginRegistry {
    pub fn new(config: RegistryConfig, catalog: FactoryCatalog, context: HostContext) -> Self {
        let store = DescriptorStore::new(&config.plugin_root);
        let loader = PluginLoader::new(
            store.clone(),
            catalog,
            config.shadow_dir.clone(),
            config.hook_timeout,
        );

        Self {
            store,
            loader,
            context: Arc::new(context),
            hook_timeout: config.hook_timeout,
            slots: Mutex::new(HashMap::new()),
            mounts: Mutex::new(MountTable::new()),
        }
    }

    /// Root directory plugins are discovered under
    pub fn plugin_root(&self) -> &Path {
        self.store.root()
    }

    /// Shared host context handed to every plugin
    pub fn context(&self) -> &Arc<HostContext> {
        &self.context
    }

    fn slot(&self, id: &str) -> SlotRef {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id.to_string()).or_default().clone()
    }

    fn existing_slot(&self, id: &str) -> Option<SlotRef> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(id).cloned()
    }

    fn all_slots(&self) -> Vec<(String, SlotRef)> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect()
    }

    /// Publish the outcome of an operation and release the lock. A vacant slot
    /// nobody else holds is dropped from the map.
    fn settle(&self, id: &str, slot: &SlotRef, record: RecordGuard<'_>) {
        slot.publish(id, &record);
        let vacant = record.is_none();
        drop(record);

        if vacant {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Held by the map and by the caller only.
            if Arc::strong_count(slot) == 2 && slots.get(id).is_some_and(|s| Arc::ptr_eq(s, slot))
            {
                slots.remove(id);
            }
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn mount_table(&self) -> MutexGuard<'_, MountTable> {
        self.mounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identifiers of the plugin directories currently on disk, sorted.
    ///
    /// A root that cannot be listed yields an empty list.
    pub fn discover(&self) -> Vec<String> {
        match self.store.discover() {
            Ok(mut ids) => {
                ids.sort();
                ids
            }
            Err(e) => {
                tracing::error!(root = %self.store.root().display(), error = %e, "Plugin discovery failed");
                Vec::new()
            }
        }
    }

    /// Read the descriptor, construct the plugin and record it as loaded
    pub async fn load(&self, id: &str) -> Result<()> {
        if !is_valid_identifier(id) {
            let err = RegistryError::NotFound {
                id: id.to_string(),
                path: self.store.plugin_dir(id),
            };
            return logged(id, "load", Err(err));
        }

        let slot = self.slot(id);
        let mut record = slot.record.lock().await;
        let result = self.load_locked(id, &mut record).await;
        self.settle(id, &slot, record);
        logged(id, "load", result)
    }

    /// Tear the plugin down, disabling it first if needed
    pub async fn unload(&self, id: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(id) else {
            return logged(id, "unload", Err(not_loaded(id)));
        };
        let mut record = slot.record.lock().await;
        let result = self.unload_locked(id, &mut record).await;
        self.settle(id, &slot, record);
        logged(id, "unload", result)
    }

    pub async fn enable(&self, id: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(id) else {
            return logged(id, "enable", Err(not_loaded(id)));
        };
        let mut record = slot.record.lock().await;
        let result = self.enable_locked(id, &mut record).await;
        self.settle(id, &slot, record);
        logged(id, "enable", result)
    }

    pub async fn disable(&self, id: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(id) else {
            return logged(id, "disable", Err(not_loaded(id)));
        };
        let mut record = slot.record.lock().await;
        let result = self.disable_locked(id, &mut record).await;
        self.settle(id, &slot, record);
        logged(id, "disable", result)
    }

    /// Unload and load again, restoring enablement.
    ///
    /// A failed load leaves the plugin unloaded; a failed re-enable leaves it
    /// loaded.
    pub async fn reload(&self, id: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(id) else {
            return logged(id, "reload", Err(not_loaded(id)));
        };
        let mut record = slot.record.lock().await;
        let result = self.reload_locked(id, &mut record).await;
        self.settle(id, &slot, record);
        logged(id, "reload", result)
    }

    /// Merge `patch` into the plugin's runtime config and notify the plugin
    pub async fn update_config(&self, id: &str, patch: ConfigMap) -> Result<()> {
        let Some(slot) = self.existing_slot(id) else {
            return logged(id, "update_config", Err(not_loaded(id)));
        };
        let mut record = slot.record.lock().await;
        let result = self.apply_config_locked(id, &mut record, patch).await;
        self.settle(id, &slot, record);
        logged(id, "update_config", result)
    }

    /// Current status. Never fails: an unloaded plugin reports its descriptor if
    /// it can be read.
    ///
    /// Waits for an operation in flight on the same plugin.
    pub async fn get_status(&self, id: &str) -> PluginStatus {
        let Some(slot) = self.existing_slot(id) else {
            return PluginStatus::unloaded(id, self.store.read(id).ok());
        };

        let record = slot.record.lock().await;
        match record.as_ref() {
            Some(current) => current.status(id),
            None => PluginStatus::unloaded(id, self.store.read(id).ok()),
        }
    }

    /// Identifiers with a live record as of their last finished operation, sorted.
    ///
    /// Never waits on a plugin lock.
    pub async fn loaded(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .all_slots()
            .into_iter()
            .filter(|(_, slot)| slot.published().is_some())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Status of every plugin that is on disk or loaded, as of its last finished
    /// operation. Never waits on a plugin lock.
    pub async fn statuses(&self) -> Vec<PluginStatus> {
        let mut ids = self.discover();
        ids.extend(self.loaded().await);
        ids.sort();
        ids.dedup();

        ids.into_iter()
            .map(|id| {
                self.existing_slot(&id)
                    .and_then(|slot| slot.published())
                    .unwrap_or_else(|| PluginStatus::unloaded(&id, self.store.read(&id).ok()))
            })
            .collect()
    }

    /// Every route currently mounted by a loaded plugin
    pub fn mounts(&self) -> Vec<MountedRoute> {
        self.mount_table().routes()
    }

    /// Resolve a request to the plugin serving it and the extracted path parameters
    pub fn match_route(
        &self,
        method: HttpMethod,
        path: &str,
    ) -> Option<(String, HashMap<String, String>)> {
        self.mount_table()
            .match_route(method, path)
            .map(|(route, params)| (route.plugin.clone(), params))
    }

    /// Load every discovered plugin and enable those whose descriptor asks for it
    pub async fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();

        for id in self.discover() {
            let slot = self.slot(&id);
            let mut record = slot.record.lock().await;
            if record.is_none() {
                self.start_locked(&id, &mut record, &mut report).await;
            }
            self.settle(&id, &slot, record);
        }

        tracing::info!(
            loaded = report.loaded.len(),
            enabled = report.enabled.len(),
            failed = report.failed.len(),
            "Plugin startup complete"
        );
        report
    }

    /// Unload every loaded plugin. Plugins are torn down concurrently, so one
    /// stuck hook does not hold up the others.
    pub async fn shutdown_all(&self) {
        let unloads = self.all_slots().into_iter().map(|(id, slot)| async move {
            let mut record = slot.record.lock().await;
            if record.is_some() {
                let _ = self.unload_locked(&id, &mut record).await;
            }
            self.settle(&id, &slot, record);
        });
        futures::future::join_all(unloads).await;
        tracing::info!("All plugins unloaded");
    }

    /// Apply one debounced change event under the plugin's lock.
    ///
    /// Events for plugins that are not loaded are ignored.
    pub async fn handle_change(&self, event: &ChangeEvent) -> Result<()> {
        let id = event.identifier.as_str();
        let Some(slot) = self.existing_slot(id) else {
            tracing::debug!(plugin = %id, kind = ?event.kind, "Ignoring change to unloaded plugin");
            return Ok(());
        };

        let mut record = slot.record.lock().await;
        let result = if record.is_none() {
            tracing::debug!(plugin = %id, kind = ?event.kind, "Ignoring change to unloaded plugin");
            Ok(())
        } else {
            match event.kind {
                ChangeKind::ConfigChanged => logged(
                    id,
                    "config change",
                    self.config_file_changed(id, &mut record).await,
                ),
                ChangeKind::DescriptorChanged => logged(
                    id,
                    "descriptor change",
                    self.descriptor_changed(id, &mut record).await,
                ),
            }
        };
        self.settle(id, &slot, record);
        result
    }

    async fn start_locked(
        &self,
        id: &str,
        record: &mut Option<PluginRecord>,
        report: &mut LoadReport,
    ) {
        if let Err(e) = self.load_locked(id, record).await {
            tracing::error!(plugin = %id, error = %e, "Failed to load plugin");
            report.failed.push((id.to_string(), e));
            return;
        }
        report.loaded.push(id.to_string());

        let wants_enabled = record
            .as_ref()
            .is_some_and(|current| current.metadata.enabled_by_default);
        if !wants_enabled {
            tracing::debug!(plugin = %id, "Plugin disabled by descriptor, not enabling");
            return;
        }

        match self.enable_locked(id, record).await {
            Ok(()) => report.enabled.push(id.to_string()),
            Err(e) => {
                tracing::error!(plugin = %id, error = %e, "Failed to enable plugin");
                report.failed.push((id.to_string(), e));
            }
        }
    }

    async fn load_locked(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        if record.is_some() {
            return Err(RegistryError::AlreadyLoaded { id: id.to_string() });
        }

        let descriptor = self.store.read(id)?;
        let mut config = descriptor.embedded_config.clone();
        if let Some(file) = self.store.read_config(id)? {
            merge_config(&mut config, file);
        }

        let mut module = self
            .loader
            .load(id, &descriptor, self.context.clone(), config.clone())
            .await?;
        let described = hooks::call(id, "identity", || module.instance.identity())
            .and_then(|identity| {
                hooks::call(id, "mountable", || module.instance.mountable())
                    .map(|mount| (identity, mount))
            })
            .map_err(|cause| RegistryError::InitializationFailed {
                id: id.to_string(),
                cause,
            });

        let mounted = described.and_then(|(identity, mount)| {
            if let Some(mount) = mount.filter(|m| !m.is_empty()) {
                self.mount_table().mount(id, &mount)?;
            }
            Ok(identity)
        });

        let identity = match mounted {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(plugin = %id, error = %e, "Rolling back load");
                let _ = hooks::invoke(
                    id,
                    Hook::Unload,
                    self.hook_timeout,
                    module.instance.on_unload(),
                )
                .await;
                return Err(e);
            }
        };

        tracing::info!(
            plugin = %id,
            name = %identity.name,
            version = %identity.version,
            "Plugin loaded"
        );

        *record = Some(PluginRecord {
            module,
            identity,
            metadata: descriptor,
            config,
            is_enabled: false,
        });
        Ok(())
    }

    async fn unload_locked(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        let Some(mut current) = record.take() else {
            return Err(RegistryError::NotLoaded { id: id.to_string() });
        };

        // Teardown is best effort: hook failures are logged by `hooks::invoke`.
        if current.is_enabled {
            let disabled = hooks::invoke(
                id,
                Hook::Disable,
                self.hook_timeout,
                current.module.instance.on_disable(),
            )
            .await;
            if disabled.is_err() {
                tracing::warn!(plugin = %id, "Continuing unload after on_disable failure");
            }
            current.is_enabled = false;
        }

        let unloaded = hooks::invoke(
            id,
            Hook::Unload,
            self.hook_timeout,
            current.module.instance.on_unload(),
        )
        .await;
        if unloaded.is_err() {
            tracing::warn!(plugin = %id, "Discarding plugin after on_unload failure");
        }

        self.mount_table().unmount(id);
        drop(current);

        tracing::info!(plugin = %id, "Plugin unloaded");
        Ok(())
    }

    async fn enable_locked(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        let current = record
            .as_mut()
            .ok_or_else(|| RegistryError::NotLoaded { id: id.to_string() })?;
        if current.is_enabled {
            return Err(RegistryError::AlreadyEnabled { id: id.to_string() });
        }

        hooks::invoke(
            id,
            Hook::Enable,
            self.hook_timeout,
            current.module.instance.on_enable(),
        )
        .await
        .map_err(|cause| RegistryError::HookFailed {
            id: id.to_string(),
            hook: Hook::Enable,
            cause,
        })?;

        current.is_enabled = true;
        tracing::info!(plugin = %id, "Plugin enabled");
        Ok(())
    }

    async fn disable_locked(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        let current = record
            .as_mut()
            .ok_or_else(|| RegistryError::NotLoaded { id: id.to_string() })?;
        if !current.is_enabled {
            return Err(RegistryError::AlreadyDisabled { id: id.to_string() });
        }

        hooks::invoke(
            id,
            Hook::Disable,
            self.hook_timeout,
            current.module.instance.on_disable(),
        )
        .await
        .map_err(|cause| RegistryError::HookFailed {
            id: id.to_string(),
            hook: Hook::Disable,
            cause,
        })?;

        current.is_enabled = false;
        tracing::info!(plugin = %id, "Plugin disabled");
        Ok(())
    }

    async fn reload_locked(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        let was_enabled = match record.as_ref() {
            Some(current) => current.is_enabled,
            None => return Err(RegistryError::NotLoaded { id: id.to_string() }),
        };

        self.unload_locked(id, record).await?;
        self.load_locked(id, record).await?;
        if was_enabled {
            self.enable_locked(id, record).await?;
        }

        tracing::info!(plugin = %id, enabled = was_enabled, "Plugin reloaded");
        Ok(())
    }

    async fn apply_config_locked(
        &self,
        id: &str,
        record: &mut Option<PluginRecord>,
        patch: ConfigMap,
    ) -> Result<()> {
        let current = record
            .as_mut()
            .ok_or_else(|| RegistryError::NotLoaded { id: id.to_string() })?;

        merge_config(&mut current.config, patch);
        let config = current.config.clone();

        let notified = hooks::invoke(
            id,
            Hook::ConfigChanged,
            self.hook_timeout,
            current.module.instance.on_config_changed(&config),
        )
        .await;
        if notified.is_err() {
            tracing::warn!(plugin = %id, "Config merged but the plugin rejected it");
        }

        tracing::debug!(plugin = %id, keys = config.len(), "Plugin config updated");
        Ok(())
    }

    async fn config_file_changed(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        let patch = self.store.read_config(id)?.unwrap_or_default();
        tracing::info!(plugin = %id, "Config file changed");
        self.apply_config_locked(id, record, patch).await
    }

    async fn descriptor_changed(&self, id: &str, record: &mut Option<PluginRecord>) -> Result<()> {
        // An unreadable descriptor keeps the running instance.
        let descriptor = self.store.read(id)?;
        tracing::info!(plugin = %id, "Descriptor changed, reloading");

        if let Some(current) = record.as_mut() {
            let _ = hooks::invoke(
                id,
                Hook::DescriptorChanged,
                self.hook_timeout,
                current.module.instance.on_descriptor_changed(&descriptor),
            )
            .await;
        }

        self.reload_locked(id, record).await
    }
}

fn not_loaded(id: &str) -> RegistryError {
    RegistryError::NotLoaded { id: id.to_string() }
}

/// Log a failed operation with its plugin and name, then pass the result through
fn logged(id: &str, operation: &str, result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        if e.is_invalid_transition() {
            tracing::debug!(plugin = %id, operation, error = %e, "Operation rejected");
        } else {
            tracing::error!(plugin = %id, operation, error = %e, "Operation failed");
        }
    }
    result
}
