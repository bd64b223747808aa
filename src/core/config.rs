use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::validator::{ConfigValidator, StandardValidator};
use crate::core::error::{HelperError, Result};

/// Paths and commands the helper works with. Every field has a default, so
/// the configuration file may set only what differs on this machine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HelperConfig {
    /// Apache's main configuration file. Owned by root.
    pub apache_conf: PathBuf,
    /// Per-user file included from the main configuration; holds the
    /// virtual hosts. Owned by the user.
    pub user_conf: PathBuf,
    /// Hostname resolution file. Owned by root.
    pub hosts_file: PathBuf,
    pub default_vhost_root: String,
    /// The directive that enables PHP.
    pub php_module: String,
    /// Emitted once, together with the first `Include` of the user file.
    pub name_virtual_host: String,
    pub loopback_address: String,
    pub restart_command: Vec<String>,
    pub copy_command: Vec<String>,
    /// When false, root-owned files are written with a plain copy.
    pub use_sudo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl Default for HelperConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            apache_conf: PathBuf::from("/private/etc/apache2/httpd.conf"),
            user_conf: home.join("apache.conf"),
            hosts_file: PathBuf::from("/etc/hosts"),
            default_vhost_root: "/Library/WebServer/Documents".to_string(),
            php_module: "LoadModule php5_module libexec/apache2/libphp5.so".to_string(),
            name_virtual_host: "NameVirtualHost *:80".to_string(),
            loopback_address: "127.0.0.1".to_string(),
            restart_command: vec![
                "sudo".to_string(),
                "apachectl".to_string(),
                "restart".to_string(),
            ],
            copy_command: vec!["sudo".to_string(), "cp".to_string()],
            use_sudo: true,
            editor: None,
        }
    }
}

impl HelperConfig {
    /// Same defaults, but every file lives under `root`. Handy for sandboxes.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            apache_conf: root.join("httpd.conf"),
            user_conf: root.join("apache.conf"),
            hosts_file: root.join("hosts"),
            use_sudo: false,
            ..Self::default()
        }
    }

    /// Fails with every validation issue at once.
    pub fn validate(&self) -> Result<()> {
        let issues = StandardValidator::new().validate_config(self);
        if issues.is_empty() {
            return Ok(());
        }
        Err(HelperError::PreconditionFailed(format!(
            "Found issues in configuration:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<HelperConfig>;
    fn save_config(&self, config: &HelperConfig) -> Result<()>;
    fn get_config_path(&self) -> &Path;
}

/// Loads and saves [`HelperConfig`] as TOML.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Uses `<config dir>/apache-helper/config.toml`.
    pub fn new() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            HelperError::Config("cannot determine the configuration directory".to_string())
        })?;
        Ok(Self::new_at(base.join("apache-helper").join("config.toml")))
    }

    pub fn new_at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Writes the default configuration unless a file already exists.
    /// Returns whether a file was written.
    pub fn initialize(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| HelperError::io_at("create", parent, e))?;
        }
        self.save_config(&HelperConfig::default())?;
        Ok(true)
    }
}

impl ConfigProvider for ConfigManager {
    /// A missing file means all defaults. The result is always validated.
    fn load_config(&self) -> Result<HelperConfig> {
        let config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .map_err(|e| HelperError::io_at("read", &self.config_path, e))?;
            toml::from_str(&content).map_err(|e| {
                HelperError::Config(format!(
                    "Failed to parse {}: {e}",
                    self.config_path.display()
                ))
            })?
        } else {
            HelperConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    fn save_config(&self, config: &HelperConfig) -> Result<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| HelperError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(&self.config_path, content)
            .map_err(|e| HelperError::io_at("write", &self.config_path, e))?;
        Ok(())
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().join("config.toml"));
        let config = manager.load_config().unwrap();
        assert_eq!(config.hosts_file, PathBuf::from("/etc/hosts"));
        assert_eq!(config.restart_command, vec!["sudo", "apachectl", "restart"]);
        assert!(config.use_sudo);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "hosts_file = \"/tmp/hosts\"\nuse_sudo = false\neditor = \"nano\"\n",
        )
        .unwrap();

        let config = ConfigManager::new_at(&path).load_config().unwrap();
        assert_eq!(config.hosts_file, PathBuf::from("/tmp/hosts"));
        assert!(!config.use_sudo);
        assert_eq!(config.editor.as_deref(), Some("nano"));
        assert_eq!(config.loopback_address, "127.0.0.1");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::new_at(&path);

        assert!(manager.initialize().unwrap());
        assert!(path.exists());
        fs::write(&path, "use_sudo = false\n").unwrap();
        assert!(!manager.initialize().unwrap());
        assert!(!manager.load_config().unwrap().use_sudo);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "use_sudo = \"maybe\"\n").unwrap();
        let err = ConfigManager::new_at(&path).load_config().unwrap_err();
        assert!(matches!(err, HelperError::Config(_)));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "hosts_file = \"hosts\"\nrestart_command = []\n").unwrap();
        let err = ConfigManager::new_at(&path).load_config().unwrap_err();
        match err {
            HelperError::PreconditionFailed(message) => {
                assert!(message.contains("hosts_file"));
                assert!(message.contains("restart_command"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
