use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::builders::patterns::{DirectiveMarker, DomainPattern, LineState, PatternMatcher, Presence};
use crate::builders::storage::ConfigFile;
use crate::builders::system::{
    CommandCopy, CommandService, Confirm, LocalCopy, PrivilegedCopy, ServiceController,
    TerminalPrompt,
};
use crate::builders::templates::{FragmentParams, VhostKind};
use crate::core::config::HelperConfig;
use crate::core::error::{HelperError, Result};
use crate::core::hosts::HostnameResolver;

/// How an operation ended. Every variant is a success; the "already"
/// variants are idempotent no-ops that wrote nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    AlreadyEnabled {
        directive: String,
    },
    Enabled {
        directive: String,
        uncommented: bool,
        backup: Option<PathBuf>,
    },
    /// The user answered "no"; nothing was touched.
    Declined,
    AlreadyIncluded {
        include: PathBuf,
        created_include_file: bool,
    },
    Included {
        include: PathBuf,
        created_include_file: bool,
        backup: Option<PathBuf>,
    },
    VhostExists {
        domain: String,
    },
    VhostAdded {
        domain: String,
        kind: VhostKind,
        root: String,
        backup: Option<PathBuf>,
    },
    HostMapped {
        domain: String,
        address: String,
    },
    HostAdded {
        domain: String,
        address: String,
        backup: Option<PathBuf>,
    },
}

impl Outcome {
    /// Whether a file was written.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Outcome::Enabled { .. }
                | Outcome::Included { .. }
                | Outcome::VhostAdded { .. }
                | Outcome::HostAdded { .. }
        )
    }
}

/// The side-effecting collaborators the engine depends on.
pub struct Collaborators {
    pub copier: Box<dyn PrivilegedCopy>,
    pub service: Box<dyn ServiceController>,
    pub prompt: Box<dyn Confirm>,
}

impl Collaborators {
    /// The real thing: `sudo cp`, `sudo apachectl restart` and a stdin prompt,
    /// all as configured.
    pub fn from_config(config: &HelperConfig, assume_yes: bool) -> Self {
        let copier: Box<dyn PrivilegedCopy> = if config.use_sudo {
            Box::new(CommandCopy::new(config.copy_command.clone()))
        } else {
            Box::new(LocalCopy)
        };
        Self {
            copier,
            service: Box::new(CommandService::new(config.restart_command.clone())),
            prompt: Box::new(TerminalPrompt::new(assume_yes)),
        }
    }
}

/// Applies configuration changes exactly once: classify the current text,
/// decide between no-op, uncomment and append, back up, write, restart.
pub struct ConfigMutator {
    config: HelperConfig,
    copier: Box<dyn PrivilegedCopy>,
    service: Box<dyn ServiceController>,
    prompt: Box<dyn Confirm>,
}

impl ConfigMutator {
    pub fn new(config: HelperConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            copier: collaborators.copier,
            service: collaborators.service,
            prompt: collaborators.prompt,
        }
    }

    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    pub fn hostname_resolver(&self) -> HostnameResolver<'_> {
        HostnameResolver::new(
            &self.config.hosts_file,
            &self.config.loopback_address,
            self.copier.as_ref(),
        )
    }

    /// Makes sure `marker` is an active line of `path`. Asks before writing;
    /// an already active marker never prompts.
    pub fn ensure_directive_active(
        &self,
        path: &Path,
        marker: &DirectiveMarker,
        protected: bool,
    ) -> Result<Outcome> {
        let file = ConfigFile::read(path, protected)?;
        let state = marker.classify(&file.contents);
        info!("{} is {state} in {}", marker.literal(), path.display());

        let patched = match state {
            LineState::Active => {
                return Ok(Outcome::AlreadyEnabled {
                    directive: marker.literal().to_string(),
                });
            }
            LineState::CommentedOut => marker.uncomment_first(&file.contents),
            LineState::Absent => None,
        };

        let question = format!(
            "{} does not have `{}` enabled. Do you want to enable it?",
            path.display(),
            marker.literal()
        );
        if !self.prompt.ask(&question)? {
            warn!("enabling {} declined", marker.literal());
            return Ok(Outcome::Declined);
        }

        let uncommented = patched.is_some();
        let contents = patched
            .unwrap_or_else(|| append_lines(&file.contents, &format!("{}\n", marker.literal())));
        let backup = file.replace(&contents, self.copier.as_ref())?;
        self.service.restart()?;

        Ok(Outcome::Enabled {
            directive: marker.literal().to_string(),
            uncommented,
            backup,
        })
    }

    /// Enables the configured PHP module in the main configuration.
    pub fn enable_php(&self) -> Result<Outcome> {
        let marker = DirectiveMarker::new(&self.config.php_module)?;
        self.ensure_directive_active(&self.config.apache_conf, &marker, true)
    }

    /// Makes sure the root-owned configuration at `path` includes
    /// `include_path`, creating an empty include file first if needed. The
    /// name-based virtual hosting directive is only ever written together with
    /// the first `Include`.
    pub fn ensure_included(&self, path: &Path, include_path: &Path) -> Result<Outcome> {
        let created_include_file = create_if_missing(include_path)?;

        let include = include_path.to_string_lossy();
        let file = ConfigFile::read(path, true)?;
        let pattern = DomainPattern::include(&include)?;

        if pattern.classify(&file.contents).is_present() {
            return Ok(Outcome::AlreadyIncluded {
                include: include_path.to_path_buf(),
                created_include_file,
            });
        }

        let addition = format!("\n{}\nInclude {include}\n", self.config.name_virtual_host);
        let contents = append_lines(&file.contents, &addition);
        let backup = file.replace(&contents, self.copier.as_ref())?;
        self.service.restart()?;

        Ok(Outcome::Included {
            include: include_path.to_path_buf(),
            created_include_file,
            backup,
        })
    }

    /// `ensure_included` for the configured main and user files.
    pub fn setup_user_conf(&self) -> Result<Outcome> {
        self.ensure_included(&self.config.apache_conf, &self.config.user_conf)
    }

    /// Appends a virtual host stanza for `domain` to the user include file,
    /// unless a `ServerName` line for it already exists there.
    pub fn add_vhost(&self, domain: &str, doc_root: &str, kind: VhostKind) -> Result<Outcome> {
        let domain = require_domain(domain)?;
        let user_conf = &self.config.user_conf;
        if !user_conf.exists() {
            return Err(HelperError::PreconditionFailed(format!(
                "User configuration file {} does not exist. Run `apache-helper setup userconf` first.",
                user_conf.display()
            )));
        }

        let file = ConfigFile::read(user_conf, false)?;
        let pattern = DomainPattern::server_name(domain)?;
        if pattern.classify(&file.contents).is_present() {
            return Ok(Outcome::VhostExists {
                domain: domain.to_string(),
            });
        }

        let params = FragmentParams::new(domain, doc_root, kind);
        let contents = append_lines(&file.contents, &params.render());
        let backup = file.replace(&contents, self.copier.as_ref())?;
        self.service.restart()?;

        Ok(Outcome::VhostAdded {
            domain: domain.to_string(),
            kind,
            root: params.root(),
            backup,
        })
    }

    /// Current state of the configured PHP directive, for reporting.
    pub fn php_state(&self) -> Result<LineState> {
        let marker = DirectiveMarker::new(&self.config.php_module)?;
        let file = ConfigFile::read(&self.config.apache_conf, true)?;
        Ok(marker.classify(&file.contents))
    }

    /// Whether the main configuration includes the user file, for reporting.
    pub fn include_presence(&self) -> Result<Presence> {
        let pattern = DomainPattern::include(&self.config.user_conf.to_string_lossy())?;
        let file = ConfigFile::read(&self.config.apache_conf, true)?;
        Ok(pattern.classify(&file.contents))
    }
}

/// Rejects a blank domain; returns it trimmed.
pub(crate) fn require_domain(domain: &str) -> Result<&str> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(HelperError::NotFound(
            "Please specify a host name to add.".to_string(),
        ));
    }
    Ok(domain)
}

/// Appends `addition`, first terminating a last line that lacks a newline.
pub(crate) fn append_lines(text: &str, addition: &str) -> String {
    let mut out = String::with_capacity(text.len() + addition.len() + 1);
    out.push_str(text);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(addition);
    out
}

/// Touches `path` if it does not exist. Returns whether it was created.
fn create_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HelperError::io_at("create", path, e))?;
    info!("created {}", path.display());
    Ok(true)
}
