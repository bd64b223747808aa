use std::ffi::OsStr;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::core::error::{HelperError, Result};

/// Copies a file over a destination the current user may not own.
pub trait PrivilegedCopy {
    /// Copies `src` over `dst`.
    ///
    /// # Arguments
    /// * `src`: A readable file, usually a staged temp file.
    /// * `dst`: The destination, replaced in full.
    ///
    /// # Returns
    /// `Ok(())` only once the copy has completed; a failed or refused copy
    /// is an error, never a silent no-op.
    fn copy(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// Restarts the web server after its configuration changed.
pub trait ServiceController {
    fn restart(&self) -> Result<()>;
}

/// Opens a file in the user's editor.
pub trait EditorLauncher {
    fn launch(&self, path: &Path) -> Result<()>;
}

/// Asks the user a yes/no question.
pub trait Confirm {
    /// # Arguments
    /// * `question`: Shown to the user as is.
    ///
    /// # Returns
    /// `Ok(true)` for agreement, `Ok(false)` for anything else.
    fn ask(&self, question: &str) -> Result<bool>;
}

/// Runs an external copy command such as `sudo cp <src> <dst>`.
pub struct CommandCopy {
    argv: Vec<String>,
}

impl CommandCopy {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl PrivilegedCopy for CommandCopy {
    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        run_command(&self.argv, [src.as_os_str(), dst.as_os_str()])
    }
}

/// Plain filesystem copy, for files the user can write directly.
pub struct LocalCopy;

impl PrivilegedCopy for LocalCopy {
    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        debug!("copy {} -> {}", src.display(), dst.display());
        fs::copy(src, dst).map_err(|e| {
            HelperError::io(
                format!("Failed to copy {} to {}", src.display(), dst.display()),
                e,
            )
        })?;
        Ok(())
    }
}

/// Restarts the service with a configured command, `sudo apachectl restart`
/// by default.
pub struct CommandService {
    argv: Vec<String>,
}

impl CommandService {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ServiceController for CommandService {
    fn restart(&self) -> Result<()> {
        run_command(&self.argv, std::iter::empty::<&OsStr>())
    }
}

/// Launches an editor command line; `$EDITOR` may carry its own arguments
/// (`code -w`), so the command is split on whitespace.
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Picks the configured editor, then `$EDITOR`, then `vi`.
    pub fn resolve(configured: Option<&str>) -> Self {
        let command = configured
            .map(str::to_string)
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl EditorLauncher for CommandEditor {
    fn launch(&self, path: &Path) -> Result<()> {
        let argv: Vec<String> = self.command.split_whitespace().map(str::to_string).collect();
        run_command(&argv, [path.as_os_str()])
    }
}

/// Prompts on stdout and reads one line from stdin. Only `y` or `yes` count
/// as agreement. With `assume_yes` the question is printed and answered
/// without reading anything.
pub struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for TerminalPrompt {
    fn ask(&self, question: &str) -> Result<bool> {
        if self.assume_yes {
            println!("{question} (y/n) y");
            return Ok(true);
        }
        print!("{question} (y/n) ");
        io::stdout()
            .flush()
            .map_err(|e| HelperError::io("Failed to write prompt", e))?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| HelperError::io("Failed to read answer", e))?;
        Ok(is_yes(&answer))
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Runs `argv` followed by `extra` arguments with inherited stdio (so `sudo`
/// can ask for a password) and turns a non-zero exit status into an error.
fn run_command<I, S>(argv: &[String], extra: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let Some((program, args)) = argv.split_first() else {
        return Err(HelperError::Config("empty command line".to_string()));
    };
    let mut command = Command::new(program);
    command.args(args).args(extra);
    let shown = format!("{command:?}");
    debug!("running {shown}");

    let status = command.status().map_err(|e| HelperError::CommandFailed {
        command: shown.clone(),
        status: e.to_string(),
    })?;
    if !status.success() {
        return Err(HelperError::CommandFailed {
            command: shown,
            status: status.to_string(),
        });
    }
    Ok(())
}
