use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::HostConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the host configuration.
    ///
    /// An explicit path must exist. Without one, the user config file is used
    /// if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<HostConfig> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::user_config_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    tracing::debug!(path = %path.display(), "No config file, using defaults");
                    Ok(HostConfig::default())
                }
            }
        }
    }

    /// Get user config path (`$XDG_CONFIG_HOME/hotswap/config.toml`)
    pub fn user_config_path() -> PathBuf {
        hotswap_paths::config_file()
    }

    fn load_from(path: &Path) -> Result<HostConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: HostConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[plugins]
root = "/opt/plugins"
watch = false

[log]
level = "warn"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.plugins.root, PathBuf::from("/opt/plugins"));
        assert!(!config.plugins.watch);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[plugins\nroot = ").unwrap();

        assert!(ConfigLoader::load(Some(&path)).is_err());
    }
}
