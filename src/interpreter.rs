use crate::builtin::{Cd, CheckEnv, Exit};
use crate::command::{CommandFactory, CommandLine, ExitCode, Outcome};
use crate::env::Environment;
use crate::external::ExternalCommand;
use crate::jobs::{ChildHandle, JobReport, reap_finished};
use crate::parser;
use anyhow::Result;
use nix::unistd::Pid;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate — builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What one input line amounted to, for the read loop and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A foreground command finished with this exit code.
    Ran(ExitCode),
    /// A background child was launched and is now tracked by the job table.
    Background(Pid),
    /// Blank input; nothing was dispatched.
    NoCommand,
    /// The user asked the shell to terminate.
    Exit,
}

/// The interactive job-control engine: reads one line per iteration,
/// dispatches it to a builtin or an external launch, and tracks completions.
///
/// Foreground children are waited for synchronously under the SIGCHLD gate;
/// background children are collected by a non-blocking sweep at the top of
/// every loop iteration.
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    jobs: Vec<ChildHandle>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            jobs: Vec::new(),
        }
    }

    /// Parse and run one input line, writing status lines to the shell's
    /// stdout.
    pub fn run_line(&mut self, line: &str) -> Result<Status> {
        self.run_line_with_output(line, &mut std::io::stdout())
    }

    /// Like [`run_line`](Self::run_line) but with a caller-supplied sink for
    /// status lines, so tests can capture them.
    pub fn run_line_with_output(&mut self, line: &str, out: &mut dyn Write) -> Result<Status> {
        let Some(parsed) = parser::parse_line(line)? else {
            return Ok(Status::NoCommand);
        };
        self.dispatch(parsed, out)
    }

    fn dispatch(&mut self, line: CommandLine, out: &mut dyn Write) -> Result<Status> {
        let mut created = None;
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, &line) {
                created = Some(cmd);
                break;
            }
        }
        let cmd = created.ok_or_else(|| anyhow::anyhow!("command not found: {}", line.name()))?;

        match cmd.execute(out, &mut self.env)? {
            Outcome::Completed(code) => Ok(Status::Ran(code)),
            Outcome::Launched(handle) => {
                let pid = handle.pid;
                self.jobs.push(handle);
                Ok(Status::Background(pid))
            }
            Outcome::Exit => Ok(Status::Exit),
        }
    }

    /// Sweep the job table for finished background children. Non-blocking;
    /// returns one report per collected child.
    pub fn collect_finished(&mut self) -> Vec<JobReport> {
        reap_finished(&mut self.jobs)
    }

    /// Background children still tracked by the job table.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// The interactive read loop.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            for report in self.collect_finished() {
                println!(
                    "background process {} {} after {} ms",
                    report.pid,
                    report.describe(),
                    report.elapsed.as_millis()
                );
            }

            match rl.readline("jobshell> ") {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    match self.run_line(&line) {
                        Ok(Status::Exit) => break,
                        Ok(_) => {}
                        Err(e) => println!("jobshell: {e:#}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("jobshell: {err:?}");
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default dispatch surface:
    /// built-ins `cd`, `exit`, `checkEnv`, then the external catch-all.
    /// Order matters: the external factory accepts everything.
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<CheckEnv>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
