//! Local kernel version query via an external process.
//!
//! The running kernel version comes from `wsl.exe uname -r`. The program
//! and arguments are injectable so tests can substitute a harmless command;
//! the watch loop only ever sees a trimmed stdout string or `None`.

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// External command that reports the current kernel version.
#[derive(Debug, Clone)]
pub struct KernelQuery {
    program: String,
    args: Vec<String>,
}

impl KernelQuery {
    /// Query using an arbitrary program and arguments.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the current kernel version.
    ///
    /// Returns the trimmed stdout on a zero exit code, `None` on spawn
    /// failure, a non-zero exit, blank output, or cancellation. Cancellation
    /// kills the spawned process rather than leaving it to run out.
    pub async fn current_version(&self, cancel: &CancellationToken) -> Option<String> {
        // kill_on_drop: dropping the wait on cancellation must reap the
        // child, not orphan it.
        let output = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(program = %self.program, "kernel query cancelled");
                return None;
            }
            output = Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output() => output,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                debug!(program = %self.program, error = %e, "kernel query failed to run");
                return None;
            }
        };

        if !output.status.success() {
            debug!(program = %self.program, status = %output.status, "kernel query exited non-zero");
            return None;
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if version.is_empty() { None } else { Some(version) }
    }
}

impl Default for KernelQuery {
    /// The production query: `wsl.exe uname -r`.
    fn default() -> Self {
        Self::new("wsl.exe", ["uname", "-r"])
    }
}
