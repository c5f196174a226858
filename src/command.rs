use crate::env::Environment;
use crate::jobs::ChildHandle;
use anyhow::Result;
use std::io::Write;

pub type ExitCode = i32;

/// One parsed input line: the bounded token list plus the background flag
/// stripped from a trailing `&`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub tokens: Vec<String>,
    pub background: bool,
}

impl CommandLine {
    /// The command name, i.e. the first token.
    pub fn name(&self) -> &str {
        &self.tokens[0]
    }

    /// Everything after the command name.
    pub fn args(&self) -> Vec<&str> {
        self.tokens[1..].iter().map(String::as_str).collect()
    }
}

/// What the read loop should do after a command has been handled.
#[derive(Debug)]
pub enum Outcome {
    /// The command ran to completion in the foreground.
    Completed(ExitCode),
    /// A child keeps running in the background; the handle must be handed to
    /// the reaper so the child is collected exactly once.
    Launched(ChildHandle),
    /// The user asked the shell to terminate.
    Exit,
}

pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>>;
}

pub trait ExecutableCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome>;
}
