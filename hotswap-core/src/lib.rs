//! hotswap-core: plugin registry and hot-reload engine
//!
//! This crate provides the host side of hotswap:
//!
//! - **Descriptor store** - [`DescriptorStore`] discovers plugin directories and reads
//!   `plugin.json` / `config.json`
//! - **Loader** - [`PluginLoader`] resolves an entry point through the built-in
//!   [`FactoryCatalog`] or a native library and runs `on_load`
//! - **Registry** - [`PluginRegistry`] owns plugin records and serializes their
//!   lifecycle per identifier
//! - **Watcher** - [`PluginWatcher`] turns file edits into debounced [`ChangeEvent`]s
//!   the registry applies in order
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hotswap_core::{FactoryCatalog, PluginRegistry, PluginWatcher, RegistryConfig, WatcherConfig};
//! use hotswap_plugin_api::HostContext;
//!
//! # async fn example() -> Result<(), hotswap_core::RegistryError> {
//! let config = RegistryConfig::new("/srv/plugins");
//! let context = HostContext::new(&config.plugin_root);
//! let registry = Arc::new(PluginRegistry::new(config, FactoryCatalog::new(), context));
//!
//! registry.load_all().await;
//! let _watcher = PluginWatcher::start(&registry, WatcherConfig::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! notify thread ──blocking_send──▶ debounce task ──▶ change queue ──▶ consumer
//!                                                                     │
//!                                              per-plugin FIFO worker ◀┘
//!                                                     │
//! external callers ──▶ PluginRegistry (lock per plugin) ──▶ PluginLoader ──▶ DescriptorStore
//! ```

pub mod descriptor;
pub mod error;
pub mod events;
mod hooks;
pub mod loader;
pub mod mounts;
pub mod registry;
pub mod watcher;

pub use descriptor::{CONFIG_FILE, DESCRIPTOR_FILE, DescriptorStore};
pub use error::{Hook, RegistryError, Result};
pub use events::{ChangeEvent, ChangeKind};
pub use loader::{FactoryCatalog, LoadedModule, PluginLoader};
pub use mounts::{MountTable, MountedRoute};
pub use registry::{
    DEFAULT_HOOK_TIMEOUT, LoadReport, PluginRegistry, PluginState, PluginStatus, RegistryConfig,
};
pub use watcher::{PluginWatcher, WatcherConfig};
