/// Apache Helper:
/// Setting up Apache for local development on a Mac always means the same
/// handful of edits: enable PHP, include a per-user configuration, add a
/// VirtualHost and point its domain at localhost. This tool does them for
/// you, once, with a backup of every file it touches.
use anyhow::Result;
use apache_helper::utils::{self, EditTarget, GlobalOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apache-helper", version)]
#[command(about = "Helper to set up common Apache configurations for local dev environments")]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Print outcomes as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Open a configuration file in your editor
    Edit {
        #[command(subcommand)]
        target: EditCommands,
    },
    /// One-time setup steps
    Setup {
        #[command(subcommand)]
        target: SetupCommands,
    },
    /// Modify the Apache configuration to enable PHP support
    Php,
    /// Add things to the configuration
    Add {
        #[command(subcommand)]
        target: AddCommands,
    },
    /// Show what is currently configured
    Status,
}

#[derive(Subcommand)]
enum EditCommands {
    /// Apache's main configuration file
    Conf,
    /// Your user-specific configuration file
    Userconf,
    /// The hosts file
    Hosts,
}

#[derive(Subcommand)]
enum SetupCommands {
    /// Configure Apache to load a user-specific configuration file
    Userconf,
}

#[derive(Subcommand)]
enum AddCommands {
    /// Add a new VirtualHost and map its domain to localhost
    Vhost {
        /// Host name to serve, e.g. myapp.local
        domain: Option<String>,
        /// Path to serve for this VirtualHost
        #[arg(long)]
        path: Option<String>,
        /// Configure the VirtualHost for a Rails site served by Passenger
        #[arg(long)]
        rails: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let options = GlobalOptions {
        config_path: cli.config,
        assume_yes: cli.yes,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => utils::initialize_config(&options),
        Commands::Edit { target } => {
            let target = match target {
                EditCommands::Conf => EditTarget::Conf,
                EditCommands::Userconf => EditTarget::UserConf,
                EditCommands::Hosts => EditTarget::Hosts,
            };
            utils::edit(&options, target)
        }
        Commands::Setup {
            target: SetupCommands::Userconf,
        } => utils::setup_user_conf(&options),
        Commands::Php => utils::enable_php(&options),
        Commands::Add {
            target: AddCommands::Vhost { domain, path, rails },
        } => utils::add_vhost(&options, domain.as_deref(), path.as_deref(), rails),
        Commands::Status => utils::show_status(&options),
    }
}
