//! Tracking launched children: the foreground waiter and the background
//! reaper.

use crate::command::ExitCode;
use crate::signal::SignalGate;
use anyhow::{Context, Result};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::time::{Duration, Instant};

/// A launched child the shell still has to collect.
///
/// Deliberately not `Clone`: a handle is consumed by exactly one wait, either
/// the foreground [`wait_foreground`] or the background [`reap_finished`]
/// sweep, never both.
#[derive(Debug)]
pub struct ChildHandle {
    pub pid: Pid,
    pub started_at: Instant,
    pub background: bool,
}

/// Completion record for a collected child.
#[derive(Debug)]
pub struct JobReport {
    pub pid: Pid,
    pub status: WaitStatus,
    pub elapsed: Duration,
}

impl JobReport {
    /// Human-readable exit description: normal exit or terminating signal.
    pub fn describe(&self) -> String {
        match self.status {
            WaitStatus::Exited(_, code) => format!("exited with status {code}"),
            WaitStatus::Signaled(_, signal, _) => {
                format!("terminated by signal {}", signal as i32)
            }
            other => format!("changed state: {other:?}"),
        }
    }

    /// Shell-convention exit code: the child's own code, or `128 + signal`
    /// for a signalled death.
    pub fn exit_code(&self) -> ExitCode {
        match self.status {
            WaitStatus::Exited(_, code) => code,
            WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
            _ => -1,
        }
    }
}

/// Block until one specific foreground child terminates.
///
/// Taking the [`SignalGate`] by value enforces the discipline: the caller must
/// have blocked `SIGCHLD` before forking, and the gate is released here only
/// after the wait has consumed this child's status. The wait is scoped to the
/// handle's pid, never "any child", so completions of unrelated background
/// jobs are left for the reaper.
pub fn wait_foreground(handle: ChildHandle, gate: SignalGate) -> Result<JobReport> {
    let status =
        waitpid(handle.pid, None).with_context(|| format!("waitpid({})", handle.pid))?;
    drop(gate);
    Ok(JobReport {
        pid: handle.pid,
        status,
        elapsed: handle.started_at.elapsed(),
    })
}

/// Collect every background child that has terminated, without blocking.
///
/// One non-blocking poll per tracked pid; children that are still running
/// stay in the table. Each poll is scoped to its own pid so the sweep can
/// never consume a status belonging to a child it does not track. Tolerates
/// an empty table and drains any number of simultaneously finished children
/// in one call.
pub fn reap_finished(jobs: &mut Vec<ChildHandle>) -> Vec<JobReport> {
    let mut reports = Vec::new();
    let mut ix = 0;
    while ix < jobs.len() {
        match waitpid(jobs[ix].pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => ix += 1,
            Ok(status) => {
                let job = jobs.swap_remove(ix);
                reports.push(JobReport {
                    pid: job.pid,
                    status,
                    elapsed: job.started_at.elapsed(),
                });
            }
            // ECHILD: the child is gone with no collectable status. Drop the
            // entry so the table cannot accumulate dead handles.
            Err(_) => {
                jobs.swap_remove(ix);
            }
        }
    }
    reports
}
