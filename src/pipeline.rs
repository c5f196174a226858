//! The fixed multi-stage pipeline behind the `checkEnv` built-in.
//!
//! Stage chaining follows one rule: keep a "current input" descriptor,
//! initially the shell's own stdin. Every non-terminal stage gets the current
//! input and writes into a fresh pipe; the pipe's read end becomes the next
//! stage's input. Ownership of the pipe ends does the descriptor hygiene: the
//! parent's copy of a write end is closed inside `launch`, so no consumer ever
//! blocks waiting for an end-of-input that cannot arrive.

use crate::env::Environment;
use crate::jobs::{self, JobReport};
use crate::launcher::{LaunchRequest, Redirect, launch};
use crate::signal::SignalGate;
use anyhow::{Context, Result};
use nix::sys::wait::waitpid;
use nix::unistd::pipe;

/// Pager run as the terminal stage when `$PAGER` is unset.
pub const PRIMARY_PAGER: &str = "less";
/// Tried by the terminal-stage child if exec of the primary pager fails.
pub const FALLBACK_PAGER: &str = "more";

/// Run `printenv | [grep filters…] | sort | pager` as foreground children and
/// return the terminal stage's completion report.
///
/// The filter stage is only present when `filters` is non-empty. The terminal
/// stage writes to `out`, which is the shell's stdout in normal use and a
/// pipe in tests. The whole chain runs under one [`SignalGate`]; every stage
/// is waited on by its specific pid, intermediates first, terminal last.
pub fn run_check_env(filters: &[String], env: &Environment, out: Redirect) -> Result<JobReport> {
    let mut stages: Vec<Vec<String>> = vec![vec!["printenv".to_string()]];
    if !filters.is_empty() {
        let mut grep = vec!["grep".to_string()];
        grep.extend(filters.iter().cloned());
        stages.push(grep);
    }
    stages.push(vec!["sort".to_string()]);
    let pager = env
        .get_var("PAGER")
        .unwrap_or_else(|| PRIMARY_PAGER.to_string());

    let gate = SignalGate::block()?;
    let mut input = Redirect::Inherit;
    let mut running = Vec::new();
    for argv in stages {
        let (read_end, write_end) = pipe().context("pipe")?;
        let stage = launch(
            LaunchRequest {
                argv,
                stdin: input,
                stdout: Redirect::Fd(write_end),
                fallback: None,
            },
            false,
        )?;
        running.push(stage);
        input = Redirect::Fd(read_end);
    }

    let terminal = launch(
        LaunchRequest {
            argv: vec![pager],
            stdin: input,
            stdout: out,
            fallback: Some(FALLBACK_PAGER.to_string()),
        },
        false,
    )?;

    for stage in running {
        waitpid(stage.pid, None).with_context(|| format!("waitpid({})", stage.pid))?;
    }
    jobs::wait_foreground(terminal, gate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::OwnedFd;

    fn capture(filters: &[&str], env: &Environment) -> (i32, String) {
        let filters: Vec<String> = filters.iter().map(|s| s.to_string()).collect();
        let (read_end, write_end): (OwnedFd, OwnedFd) = pipe().unwrap();
        let report = run_check_env(&filters, env, Redirect::Fd(write_end)).unwrap();
        let mut out = String::new();
        File::from(read_end).read_to_string(&mut out).unwrap();
        (report.exit_code(), out)
    }

    fn cat_paged_env() -> Environment {
        let mut env = Environment::new();
        // A pager that just copies its input keeps the test non-interactive.
        env.set_var("PAGER", "cat");
        env
    }

    #[test]
    fn filtered_listing_is_sorted() {
        let env = cat_paged_env();
        let (code, out) = capture(&["PATH"], &env);
        assert_eq!(code, 0);

        let lines: Vec<&str> = out.lines().collect();
        assert!(!lines.is_empty(), "expected at least the PATH variable");
        for line in &lines {
            assert!(line.contains("PATH"), "unfiltered line slipped through: {line}");
        }
        for pair in lines.windows(2) {
            assert!(pair[0] <= pair[1], "not sorted: {:?} > {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn filtered_listing_is_a_subset_of_the_full_listing() {
        let env = cat_paged_env();
        let (_, full) = capture(&[], &env);
        let (_, filtered) = capture(&["HOME"], &env);

        let full: HashSet<&str> = full.lines().collect();
        for line in filtered.lines() {
            assert!(full.contains(line), "filtered line not in full listing: {line}");
        }
    }

    #[test]
    fn missing_pager_falls_back() {
        let mut env = Environment::new();
        env.set_var("PAGER", "jobshell-no-such-pager");
        // FALLBACK_PAGER is "more"; when even that is absent the terminal
        // child exits 127, which must surface as the pipeline's exit code
        // rather than an orchestrator error.
        let (read_end, write_end) = pipe().unwrap();
        let report = run_check_env(&[], &env, Redirect::Fd(write_end)).unwrap();
        drop(read_end);
        assert!(report.exit_code() == 0 || report.exit_code() == 127);
    }
}
