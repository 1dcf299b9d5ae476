//! External tools: the grammar generator and the repository status command
//!
//! Processes are started through [`ToolRunner`] so the workflow can be driven by a fake
//! in tests. [`SystemRunner`] is the real implementation: it resolves the program on
//! `PATH` (or relative to the repository root), runs it to completion and captures both
//! output streams. There is no timeout; a hanging tool blocks the run.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{Result, UpdateError};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// Both streams, stderr first, trimmed.
    pub fn combined(&self) -> String {
        [self.stderr.trim(), self.stdout.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Starts external processes.
pub trait ToolRunner {
    /// Run `invocation` in `cwd` and wait for it to exit.
    ///
    /// `Err` means the process could not be started at all; a process that ran and
    /// failed is an `Ok` with `success == false`.
    fn run(&self, invocation: &Invocation, cwd: &Path) -> io::Result<ToolOutput>;
}

/// Runs real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> io::Result<ToolOutput> {
        let search_path: Option<OsString> = std::env::var_os("PATH");
        let program = which::which_in(&invocation.program, search_path, cwd)
            .map_err(|err| io::Error::new(io::ErrorKind::NotFound, err))?;
        debug!(program = %program.display(), cwd = %cwd.display(), %invocation, "spawning");

        let output = Command::new(&program)
            .args(&invocation.args)
            .current_dir(cwd)
            .output()?;

        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(%invocation, status = %result.status(), "finished");
        Ok(result)
    }
}

/// Run `invocation`, treating anything but a successful exit as fatal.
pub fn run_checked(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
    cwd: &Path,
) -> Result<ToolOutput> {
    let output = runner
        .run(invocation, cwd)
        .map_err(|source| UpdateError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

    if output.success {
        Ok(output)
    } else {
        Err(UpdateError::ToolFailed {
            command: invocation.to_string(),
            status: output.status(),
            output: output.combined(),
        })
    }
}

/// Whether the generator can be used, as reported by its version query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available { version: String },
    Missing { reason: String },
}

/// The grammar generator (`tree-sitter` by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    pub version: Invocation,
    pub generate: Invocation,
    /// Printed when the generator is missing.
    pub install_hint: String,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            version: Invocation::new("tree-sitter", ["--version"]),
            generate: Invocation::new("tree-sitter", ["generate"]),
            install_hint: "npm install -g tree-sitter-cli".to_string(),
        }
    }
}

impl Generator {
    pub fn name(&self) -> &str {
        &self.generate.program
    }

    /// Query the version. Never fails: an unusable tool is [`Availability::Missing`].
    pub fn probe(&self, runner: &dyn ToolRunner, cwd: &Path) -> Availability {
        match runner.run(&self.version, cwd) {
            Ok(output) if output.success => Availability::Available {
                version: output.stdout.trim().to_string(),
            },
            Ok(output) => {
                warn!(invocation = %self.version, status = %output.status(), "version query failed");
                Availability::Missing {
                    reason: format!("`{}` failed ({})", self.version, output.status()),
                }
            }
            Err(err) => {
                warn!(invocation = %self.version, error = %err, "generator not runnable");
                Availability::Missing {
                    reason: format!("could not run `{}`: {}", self.version, err),
                }
            }
        }
    }

    pub fn generate(&self, runner: &dyn ToolRunner, cwd: &Path) -> Result<ToolOutput> {
        run_checked(runner, &self.generate, cwd)
    }
}
