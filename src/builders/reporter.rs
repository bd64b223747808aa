use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::builders::patterns::{LineState, server_names};
use crate::core::engine::{ConfigMutator, Outcome};
use crate::core::error::{HelperError, Result};

/// Existence of one of the managed files.
#[derive(Debug, Serialize)]
pub struct FileStatus {
    pub path: PathBuf,
    pub exists: bool,
}

impl FileStatus {
    fn of(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            exists: path.exists(),
        }
    }
}

/// A read-only snapshot of what is configured. Fields are `None` when the
/// file they are read from does not exist.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub apache_conf: FileStatus,
    pub user_conf: FileStatus,
    pub hosts_file: FileStatus,
    pub php_module: Option<LineState>,
    pub user_conf_included: Option<bool>,
    pub virtual_hosts: Option<Vec<String>>,
}

impl StatusReport {
    pub fn collect(mutator: &ConfigMutator) -> Result<Self> {
        let config = mutator.config();
        let apache_conf = FileStatus::of(&config.apache_conf);
        let user_conf = FileStatus::of(&config.user_conf);
        let hosts_file = FileStatus::of(&config.hosts_file);

        let (php_module, user_conf_included) = if apache_conf.exists {
            (
                Some(mutator.php_state()?),
                Some(mutator.include_presence()?.is_present()),
            )
        } else {
            (None, None)
        };

        let virtual_hosts = if user_conf.exists {
            let text = std::fs::read_to_string(&config.user_conf)
                .map_err(|e| HelperError::io_at("read", &config.user_conf, e))?;
            Some(server_names(&text))
        } else {
            None
        };

        Ok(Self {
            apache_conf,
            user_conf,
            hosts_file,
            php_module,
            user_conf_included,
            virtual_hosts,
        })
    }
}

pub trait StatusReporter {
    fn report_outcome(&self, outcome: &Outcome);
    fn report_status(&self, status: &StatusReport) -> Result<()>;
}

/// Prints to stdout, either as friendly text or as JSON.
pub struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl StatusReporter for ConsoleReporter {
    fn report_outcome(&self, outcome: &Outcome) {
        if self.json {
            match serde_json::to_string(outcome) {
                Ok(line) => println!("{line}"),
                Err(e) => println!("{}", format!("Could not serialize outcome: {e}").red()),
            }
            return;
        }

        let message = describe(outcome);
        if outcome.changed() {
            println!("{}", message.green().bold());
            if let Some(backup) = backup_of(outcome) {
                println!("  Previous contents backed up to {}", backup.display());
            }
        } else {
            println!("{}", message.cyan());
        }
    }

    fn report_status(&self, status: &StatusReport) -> Result<()> {
        if self.json {
            let text = serde_json::to_string_pretty(status)
                .map_err(|e| HelperError::Config(format!("Failed to serialize status: {e}")))?;
            println!("{text}");
            return Ok(());
        }

        println!("{}", "Apache Helper Status".cyan().bold());
        println!("====================");
        for (label, file) in [
            ("Apache configuration", &status.apache_conf),
            ("User configuration", &status.user_conf),
            ("Hosts file", &status.hosts_file),
        ] {
            println!("{} {label}: {}", file_icon(file.exists), file.path.display());
        }

        println!();
        match status.php_module {
            Some(state) => println!("  PHP module: {state}"),
            None => println!("  PHP module: unknown"),
        }
        match status.user_conf_included {
            Some(true) => println!("  User configuration included: yes"),
            Some(false) => println!("  User configuration included: no (run `setup userconf`)"),
            None => println!("  User configuration included: unknown"),
        }
        match &status.virtual_hosts {
            Some(hosts) if hosts.is_empty() => println!("  Virtual hosts: none"),
            Some(hosts) => {
                println!("  Virtual hosts:");
                for host in hosts {
                    println!("    └─ {host}");
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn file_icon(exists: bool) -> &'static str {
    if exists { "🟢" } else { "🔴" }
}

fn backup_of(outcome: &Outcome) -> Option<&Path> {
    match outcome {
        Outcome::Enabled { backup, .. }
        | Outcome::Included { backup, .. }
        | Outcome::VhostAdded { backup, .. }
        | Outcome::HostAdded { backup, .. } => backup.as_deref(),
        _ => None,
    }
}

/// One line describing an outcome to a human.
pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::AlreadyEnabled { directive } => {
            format!("Your Apache configuration already has `{directive}` enabled. Yay!")
        }
        Outcome::Enabled {
            directive,
            uncommented: true,
            ..
        } => format!("Uncommented `{directive}` and restarted Apache. Have fun!"),
        Outcome::Enabled { directive, .. } => {
            format!("Added `{directive}` and restarted Apache. Have fun!")
        }
        Outcome::Declined => "Ok, bye then.".to_string(),
        Outcome::AlreadyIncluded {
            include,
            created_include_file,
        } => {
            let created = if *created_include_file {
                format!("Created {}. ", include.display())
            } else {
                String::new()
            };
            format!(
                "{created}Apache configuration is already set up to load {}.",
                include.display()
            )
        }
        Outcome::Included {
            include,
            created_include_file,
            ..
        } => {
            let created = if *created_include_file {
                format!("Created {}. ", include.display())
            } else {
                String::new()
            };
            format!(
                "{created}Apache now loads {} and has been restarted.",
                include.display()
            )
        }
        Outcome::VhostExists { domain } => {
            format!("A VirtualHost for {domain} is already configured.")
        }
        Outcome::VhostAdded {
            domain, kind, root, ..
        } => format!("Added {kind} {domain} with document root {root} and restarted Apache."),
        Outcome::HostMapped { domain, address } => {
            format!("{domain} already resolves to {address}.")
        }
        Outcome::HostAdded {
            domain, address, ..
        } => format!("Mapped {domain} to {address} in the hosts file."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::templates::VhostKind;

    #[test]
    fn test_descriptions() {
        assert_eq!(describe(&Outcome::Declined), "Ok, bye then.");
        assert_eq!(
            describe(&Outcome::HostMapped {
                domain: "myapp.local".to_string(),
                address: "192.168.1.5".to_string(),
            }),
            "myapp.local already resolves to 192.168.1.5."
        );
        let added = Outcome::VhostAdded {
            domain: "r.local".to_string(),
            kind: VhostKind::FrameworkServed,
            root: "/srv/r".to_string(),
            backup: Some(PathBuf::from("/home/u/apache_bak_1.conf")),
        };
        assert!(describe(&added).starts_with("Added Rails VirtualHost r.local"));
        assert_eq!(
            backup_of(&added),
            Some(Path::new("/home/u/apache_bak_1.conf"))
        );
    }

    #[test]
    fn test_created_include_file_is_mentioned() {
        let text = describe(&Outcome::AlreadyIncluded {
            include: PathBuf::from("/home/u/apache.conf"),
            created_include_file: true,
        });
        assert!(text.starts_with("Created /home/u/apache.conf. "));
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let json = serde_json::to_value(Outcome::HostMapped {
            domain: "a.local".to_string(),
            address: "127.0.0.1".to_string(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "host_mapped");
        assert_eq!(json["address"], "127.0.0.1");
    }
}
