use std::net::Ipv4Addr;
use std::path::Path;

use crate::builders::patterns::DirectiveMarker;
use crate::core::config::HelperConfig;

/// The `ConfigValidator` trait defines the public interface for validating
/// the helper configuration.
pub trait ConfigValidator {
    /// Performs a full validation of the `HelperConfig`.
    ///
    /// # Arguments
    /// * `config`: The loaded configuration to check.
    ///
    /// # Returns
    /// A `Vec<String>` of human readable issues, one per problem found. An
    /// empty list means the configuration is usable.
    fn validate_config(&self, config: &HelperConfig) -> Vec<String>;
}

/// Checks that paths are absolute, commands are non-empty and the directive
/// markers can be turned into patterns.
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks that a configured path is absolute.
    ///
    /// # Arguments
    /// * `name`: The config key, used in the message.
    /// * `path`: The configured path.
    ///
    /// # Returns
    /// `Some(issue)` if the path is relative, otherwise `None`.
    fn check_absolute(&self, name: &str, path: &Path) -> Option<String> {
        if path.is_absolute() {
            None
        } else {
            Some(format!("{name} must be an absolute path, got {}", path.display()))
        }
    }

    /// Checks that a command line names a program.
    ///
    /// # Arguments
    /// * `name`: The config key, used in the message.
    /// * `argv`: Program followed by its arguments.
    ///
    /// # Returns
    /// `Some(issue)` if `argv` is empty or its program is blank.
    fn check_command(&self, name: &str, argv: &[String]) -> Option<String> {
        if argv.first().is_some_and(|program| !program.trim().is_empty()) {
            None
        } else {
            Some(format!("{name} must name a program to run"))
        }
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &HelperConfig) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.check_absolute("apache_conf", &config.apache_conf));
        issues.extend(self.check_absolute("user_conf", &config.user_conf));
        issues.extend(self.check_absolute("hosts_file", &config.hosts_file));

        issues.extend(self.check_command("restart_command", &config.restart_command));
        // Only used when files are written through sudo.
        if config.use_sudo {
            issues.extend(self.check_command("copy_command", &config.copy_command));
        }

        if let Err(e) = DirectiveMarker::new(&config.php_module) {
            issues.push(format!("php_module: {e}"));
        }
        if config.name_virtual_host.trim().is_empty() {
            issues.push("name_virtual_host cannot be blank".to_string());
        }
        if config.loopback_address.parse::<Ipv4Addr>().is_err() {
            issues.push(format!(
                "loopback_address must be an IPv4 address, got {}",
                config.loopback_address
            ));
        }
        if config.default_vhost_root.trim().is_empty() {
            issues.push("default_vhost_root cannot be blank".to_string());
        }

        issues
    }
}
