use crate::command::{CommandFactory, CommandLine, ExecutableCommand, Outcome};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::launcher::Redirect;
use crate::pipeline;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "checkEnv".
    fn name() -> &'static str;

    /// Executes the command against the provided output stream and environment.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome> {
        match BuiltinCommand::execute(*self, stdout, env) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                writeln!(stdout, "{e:#}")?;
                Ok(Outcome::Completed(1))
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<Outcome> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(Outcome::Completed(if self.is_error { 1 } else { 0 }))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        if line.name() == T::name() {
            let args = line.args();
            Some(match T::from_args(&[T::name()], &args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// With no target (or `~`), changes to the directory named by $HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome> {
        let target = match self.target.as_deref() {
            Some(t) if !t.is_empty() && t != "~" => PathBuf::from(t),
            _ => PathBuf::from(env.home().context("cd: no target and HOME not set")?),
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(Outcome::Completed(0))
    }
}

#[derive(FromArgs)]
/// Exit the shell. The shell's own exit status is always 0, regardless of
/// what any launched command returned.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; kept so stray arguments don't turn into a usage error.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<Outcome> {
        Ok(Outcome::Exit)
    }
}

#[derive(FromArgs)]
/// List environment variables, optionally filtered, then sorted and paged.
pub struct CheckEnv {
    #[argh(positional, greedy)]
    /// patterns handed to the filter stage; all variables when omitted.
    pub filters: Vec<String>,
}

impl BuiltinCommand for CheckEnv {
    fn name() -> &'static str {
        "checkEnv"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<Outcome> {
        let report = pipeline::run_check_env(&self.filters, env, Redirect::Inherit)?;
        Ok(Outcome::Completed(report.exit_code()))
    }
}
