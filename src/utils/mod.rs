use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::builders::reporter::{ConsoleReporter, StatusReport, StatusReporter};
use crate::builders::system::{CommandEditor, EditorLauncher};
use crate::builders::templates::VhostKind;
use crate::core::config::{ConfigManager, ConfigProvider, HelperConfig};
use crate::core::engine::{Collaborators, ConfigMutator};

/// Which managed file `edit` opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Conf,
    UserConf,
    Hosts,
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub assume_yes: bool,
    pub json: bool,
}

/// Logs go to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with
/// `--verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn config_manager(options: &GlobalOptions) -> Result<ConfigManager> {
    match &options.config_path {
        Some(path) => Ok(ConfigManager::new_at(path)),
        None => Ok(ConfigManager::new()?),
    }
}

fn load_config(options: &GlobalOptions) -> Result<HelperConfig> {
    let manager = config_manager(options)?;
    let config = manager
        .load_config()
        .with_context(|| format!("Failed to load {}", manager.get_config_path().display()))?;
    Ok(config)
}

fn build_mutator(options: &GlobalOptions) -> Result<ConfigMutator> {
    let config = load_config(options)?;
    let collaborators = Collaborators::from_config(&config, options.assume_yes);
    Ok(ConfigMutator::new(config, collaborators))
}

pub fn initialize_config(options: &GlobalOptions) -> Result<()> {
    let manager = config_manager(options)?;
    let path = manager.get_config_path().display().to_string();
    if manager.initialize()? {
        println!("✓ Wrote default configuration to {path}");
    } else {
        println!("ℹ️  Configuration already exists at {path}");
    }
    Ok(())
}

pub fn enable_php(options: &GlobalOptions) -> Result<()> {
    let mutator = build_mutator(options)?;
    let outcome = mutator.enable_php()?;
    ConsoleReporter::new(options.json).report_outcome(&outcome);
    Ok(())
}

pub fn setup_user_conf(options: &GlobalOptions) -> Result<()> {
    let mutator = build_mutator(options)?;
    let outcome = mutator.setup_user_conf()?;
    ConsoleReporter::new(options.json).report_outcome(&outcome);
    Ok(())
}

/// Adds the virtual host first and only then the hosts entry, so a missing
/// user configuration leaves the hosts file alone.
pub fn add_vhost(
    options: &GlobalOptions,
    domain: Option<&str>,
    path: Option<&str>,
    rails: bool,
) -> Result<()> {
    let mutator = build_mutator(options)?;
    let reporter = ConsoleReporter::new(options.json);
    let domain = domain.unwrap_or_default();
    let doc_root = path
        .unwrap_or(mutator.config().default_vhost_root.as_str())
        .to_string();
    let kind = if rails {
        VhostKind::FrameworkServed
    } else {
        VhostKind::Standard
    };

    let outcome = mutator.add_vhost(domain, &doc_root, kind)?;
    reporter.report_outcome(&outcome);

    let outcome = mutator.hostname_resolver().ensure_local_host(domain)?;
    reporter.report_outcome(&outcome);
    Ok(())
}

pub fn edit(options: &GlobalOptions, target: EditTarget) -> Result<()> {
    let config = load_config(options)?;
    let path: &Path = match target {
        EditTarget::Conf => &config.apache_conf,
        EditTarget::UserConf => &config.user_conf,
        EditTarget::Hosts => &config.hosts_file,
    };
    CommandEditor::resolve(config.editor.as_deref()).launch(path)?;
    Ok(())
}

pub fn show_status(options: &GlobalOptions) -> Result<()> {
    let mutator = build_mutator(options)?;
    let status = StatusReport::collect(&mutator)?;
    ConsoleReporter::new(options.json).report_status(&status)?;
    Ok(())
}
