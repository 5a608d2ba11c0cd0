use crate::error::{ProbeError, Result};
use std::process::Command;
use tracing::debug;

/// Captured output of a finished external command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs on behalf of the setup checks.
///
/// Implementations must return `Err` both when the program cannot be spawned
/// and when it exits unsuccessfully.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command_line = display_command(program, args);
        debug!("Running {}", command_line);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ProbeError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                command: command_line,
                status: output.status.code().unwrap_or(-1),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// True when `<program> --version` runs successfully
pub fn command_exists(runner: &dyn CommandRunner, program: &str) -> bool {
    match runner.run(program, &["--version"]) {
        Ok(_) => true,
        Err(e) => {
            debug!("{} not available: {}", program, e);
            false
        }
    }
}

pub fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
