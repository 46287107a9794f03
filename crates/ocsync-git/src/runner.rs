//! Command-runner port for external processes

use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

/// Runs an external program and returns its stdout.
///
/// A non-zero exit must surface as [`Error::CommandFailed`] carrying stderr.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String>;
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let command_line = format!("{} {}", program, args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args)
            // Never wait on an interactive credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GH_PROMPT_DISABLED", "1");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %command_line, cwd = ?cwd, "running command");
        let output = cmd.output().map_err(|source| Error::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            Err(Error::CommandFailed {
                command: command_line,
                code,
                stderr,
            })
        }
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        (**self).run(program, args, cwd)
    }
}
