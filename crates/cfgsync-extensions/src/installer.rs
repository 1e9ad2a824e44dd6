//! Extension handler backed by shell commands.
//!
//! The host environment decides how extensions are really installed; cfgsync
//! only runs the configured command and checks its exit status.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::handler::ExtensionHandler;
use crate::manifest::ExtensionKind;

/// Build a shell [`Command`] that executes `cmd_str` via the system shell.
///
/// - Unix: `sh -c "{cmd_str}"`
/// - Windows: `cmd /C "{cmd_str}"`
fn shell_command(cmd_str: &str) -> Command {
    #[cfg(windows)]
    {
        let mut c = Command::new("cmd");
        c.args(["/C", cmd_str]);
        c
    }
    #[cfg(not(windows))]
    {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_str);
        c
    }
}

/// Runs one shell command per batch of extensions.
///
/// The command sees `CFGSYNC_ACTION` (`install` or `uninstall`),
/// `CFGSYNC_EXTENSION_KIND` (`module` or `theme`) and `CFGSYNC_EXTENSIONS`
/// (space separated names) in its environment. Output is streamed to the
/// terminal. A missing command for an action makes that action a no-op.
#[derive(Debug, Clone, Default)]
pub struct CommandHandler {
    install_cmd: Option<String>,
    uninstall_cmd: Option<String>,
    working_dir: Option<PathBuf>,
}

impl CommandHandler {
    pub fn new(install_cmd: Option<String>, uninstall_cmd: Option<String>) -> Self {
        Self {
            install_cmd,
            uninstall_cmd,
            working_dir: None,
        }
    }

    /// Run commands from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Whether any command is configured.
    pub fn is_configured(&self) -> bool {
        self.install_cmd.is_some() || self.uninstall_cmd.is_some()
    }

    fn run(&self, action: &str, command: Option<&str>, kind: ExtensionKind, names: &[String]) -> Result<()> {
        let Some(command) = command else {
            tracing::debug!(action, %kind, ?names, "No command configured, skipping");
            return Ok(());
        };
        if names.is_empty() {
            return Ok(());
        }

        tracing::info!(action, %kind, ?names, command, "Running extension command");
        let mut cmd = shell_command(command);
        cmd.env("CFGSYNC_ACTION", action)
            .env("CFGSYNC_EXTENSION_KIND", kind.key())
            .env("CFGSYNC_EXTENSIONS", names.join(" "))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|source| Error::CommandSpawn {
            action: action.to_string(),
            command: command.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(Error::CommandFailed {
                action: action.to_string(),
                command: command.to_string(),
                exit_code: status.code(),
            });
        }

        Ok(())
    }
}

impl ExtensionHandler for CommandHandler {
    fn install(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.run("install", self.install_cmd.as_deref(), kind, names)
    }

    fn uninstall(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.run("uninstall", self.uninstall_cmd.as_deref(), kind, names)
    }
}
