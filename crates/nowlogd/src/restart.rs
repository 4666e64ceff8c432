//! Full process restart after a fatal boot error.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use nowlog_services::{BootError, RestartHook};

/// Exit status used when re-exec itself fails, so a supervisor restarts us.
pub const EXIT_RESTART: i32 = 75;

/// Replaces the running process with a fresh copy of itself.
pub struct ExecRestart {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecRestart {
    /// Capture the current executable and arguments.
    pub fn current() -> Result<Self> {
        let program = std::env::current_exe().context("failed to resolve current executable")?;
        Ok(Self {
            program,
            args: std::env::args_os().skip(1).collect(),
        })
    }
}

impl RestartHook for ExecRestart {
    fn restart(&self, reason: &BootError) {
        tracing::warn!(reason = %reason, program = %self.program.display(), "restarting process");
        let err = Command::new(&self.program).args(&self.args).exec();
        tracing::error!(error = %err, "re-exec failed, exiting");
        std::process::exit(EXIT_RESTART);
    }
}
