use crate::command::{CommandFactory, CommandLine, ExecutableCommand, Outcome};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::jobs::wait_foreground;
use crate::launcher::{LaunchRequest, launch};
use crate::signal::SignalGate;
use anyhow::Result;
use std::io::Write;

/// Command that is not a builtin: launched as a child process with the full
/// token list as its argv.
pub struct ExternalCommand {
    line: CommandLine,
}

impl CommandFactory for Factory<ExternalCommand> {
    /// Catch-all: every line that reached this factory names an external
    /// program. Whether the program actually exists is discovered by the
    /// child's exec attempt, and reported from there.
    fn try_create(
        &self,
        _env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand { line: line.clone() }))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<Outcome> {
        let request = LaunchRequest::new(self.line.tokens.clone());

        if self.line.background {
            let handle = launch(request, true)?;
            writeln!(stdout, "started background process {}", handle.pid)?;
            return Ok(Outcome::Launched(handle));
        }

        // The gate goes up before the fork so the awaited child's completion
        // cannot be intercepted; wait_foreground drops it after the wait.
        let gate = SignalGate::block()?;
        let handle = launch(request, false)?;
        writeln!(stdout, "started process {}", handle.pid)?;
        let report = wait_foreground(handle, gate)?;
        writeln!(
            stdout,
            "process {} {} after {} ms",
            report.pid,
            report.describe(),
            report.elapsed.as_millis()
        )?;
        Ok(Outcome::Completed(report.exit_code()))
    }
}
