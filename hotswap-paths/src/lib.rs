//! XDG Base Directory paths for hotswap.
//!
//! The host uses XDG paths on every platform rather than platform-native ones, so
//! config and data live in the same place on Linux and macOS.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "hotswap";

/// Get the hotswap config directory.
///
/// Returns `$XDG_CONFIG_HOME/hotswap` if set, otherwise `~/.config/hotswap`.
///
/// # Examples
///
/// ```
/// use hotswap_paths::config_dir;
///
/// let config = config_dir();
/// let config_file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".config",
    )
}

/// Get the hotswap data directory.
///
/// Returns `$XDG_DATA_HOME/hotswap` if set, otherwise `~/.local/share/hotswap`.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".local/share",
    )
}

/// Default location of the host config file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory native plugin libraries are copied to before being loaded.
pub fn shadow_dir() -> PathBuf {
    data_dir().join("shadow")
}

fn resolve(xdg: Option<PathBuf>, home: Option<PathBuf>, fallback: &str) -> PathBuf {
    match (xdg.filter(|p| !p.as_os_str().is_empty()), home) {
        (Some(base), _) => base.join(APP_DIR),
        (None, Some(home)) => home.join(fallback).join(APP_DIR),
        (None, None) => Path::new(fallback).join(APP_DIR),
    }
}
