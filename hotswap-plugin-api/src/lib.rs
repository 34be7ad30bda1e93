//! hotswap-plugin-api - Plugin API for the hotswap plugin host
//!
//! This crate provides the contract every hotswap plugin implements. A plugin is
//! constructed from a [`PluginInit`] (host context, descriptor metadata and runtime
//! config), walked through its lifecycle hooks by the host registry, and may expose a
//! [`MountPoint`] the host attaches externally.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use hotswap_plugin_api::{Plugin, PluginError, PluginIdentity, PluginInit, export_plugin};
//!
//! pub struct MyPlugin {
//!     init: PluginInit,
//! }
//!
//! impl From<PluginInit> for MyPlugin {
//!     fn from(init: PluginInit) -> Self {
//!         Self { init }
//!     }
//! }
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     fn identity(&self) -> PluginIdentity {
//!         PluginIdentity::new("my-plugin", "0.1.0")
//!     }
//!
//!     async fn on_load(&mut self) -> Result<(), PluginError> {
//!         self.init.logger.log_info("Plugin loaded!");
//!         Ok(())
//!     }
//!
//!     async fn on_unload(&mut self) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(MyPlugin);
//! ```

pub mod context;
pub mod error;
pub mod http;
pub mod types;

pub use context::{HostContext, PluginInit, PluginLogger};
pub use error::PluginError;
pub use http::{HttpMethod, MountPoint, RouteSpec};
pub use types::*;

use async_trait::async_trait;

/// Current plugin API version. Native plugins must match this exactly.
pub const API_VERSION: u32 = 1;

/// Name of the factory symbol a native plugin library exports.
pub const CREATE_SYMBOL: &[u8] = b"_hotswap_plugin_create";

/// Name of the API version symbol a native plugin library exports.
pub const API_VERSION_SYMBOL: &[u8] = b"_hotswap_plugin_api_version";

/// Signature of the well-known factory every plugin module exposes.
pub type PluginCreateFn = fn(PluginInit) -> Box<dyn Plugin>;

/// The capability contract - implement this to create a hotswap plugin.
///
/// Hooks are async and may perform I/O. Returning `Err` signals failure without
/// tearing down the host; the registry decides what the failure means for the
/// plugin's state. The enable/disable and change hooks default to no-ops.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable name and version. Must not have side effects.
    fn identity(&self) -> PluginIdentity;

    /// Called once after construction, before the plugin is recorded as loaded.
    async fn on_load(&mut self) -> Result<(), PluginError>;

    /// Called when the plugin transitions from loaded to enabled.
    async fn on_enable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin transitions from enabled to loaded.
    async fn on_disable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called before the plugin instance is discarded. Use this to clean up resources.
    async fn on_unload(&mut self) -> Result<(), PluginError>;

    /// Interface the host should attach externally, if any.
    fn mountable(&self) -> Option<MountPoint> {
        None
    }

    /// Called with the full merged runtime config after it changed.
    async fn on_config_changed(&mut self, _config: &ConfigMap) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the on-disk descriptor changed, before the plugin is reloaded.
    async fn on_descriptor_changed(
        &mut self,
        _descriptor: &PluginDescriptor,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Build a boxed plugin from any type constructible from a [`PluginInit`].
///
/// Useful for registering in-process plugins with a host's factory catalog.
pub fn create<T>(init: PluginInit) -> Box<dyn Plugin>
where
    T: Plugin + From<PluginInit> + 'static,
{
    Box::new(T::from(init))
}

/// Export a plugin type for dynamic loading.
///
/// The type must implement [`Plugin`] and `From<PluginInit>`.
///
/// # Generated Functions
///
/// - `_hotswap_plugin_create(init)`: Creates a new plugin instance
/// - `_hotswap_plugin_api_version()`: Returns the API version
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        pub fn _hotswap_plugin_create(
            init: $crate::PluginInit,
        ) -> ::std::boxed::Box<dyn $crate::Plugin> {
            $crate::create::<$plugin_type>(init)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _hotswap_plugin_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}
