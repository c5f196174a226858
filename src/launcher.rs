//! Creating child processes: fork, descriptor rewiring, image replacement.

use crate::jobs::ChildHandle;
use anyhow::{Context, Result, ensure};
use nix::errno::Errno;
use nix::unistd::{self, ForkResult};
use std::ffi::{CStr, CString};
use std::os::fd::{IntoRawFd, OwnedFd, RawFd};
use std::process;
use std::time::Instant;

/// Where a launched program's standard input or output comes from.
///
/// Owning the descriptor means the parent's copy is closed as soon as the
/// launch returns, so a pipe write end handed to a child is never left open in
/// the shell to stall a downstream reader.
#[derive(Debug)]
pub enum Redirect {
    /// Inherit the shell's own stream.
    Inherit,
    /// Rewire standard input/output onto this descriptor.
    Fd(OwnedFd),
}

/// Everything needed to start one external program.
#[derive(Debug)]
pub struct LaunchRequest {
    /// Program name followed by its arguments; `argv[0]` is resolved via
    /// `PATH` by `execvp`.
    pub argv: Vec<String>,
    pub stdin: Redirect,
    pub stdout: Redirect,
    /// Program tried in the child if exec of `argv[0]` fails.
    pub fallback: Option<String>,
}

impl LaunchRequest {
    /// A request that runs the given argv with both standard streams
    /// inherited from the shell.
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            stdin: Redirect::Inherit,
            stdout: Redirect::Inherit,
            fallback: None,
        }
    }
}

/// Fork and exec one external program.
///
/// In the parent this returns a [`ChildHandle`] carrying the pid and launch
/// timestamp; the handle must be consumed by exactly one wait. A fork failure
/// is returned as an error for the caller to report; the command is then
/// abandoned and the shell keeps running.
///
/// The child rewires its standard streams as requested and replaces its image
/// with the program. On exec failure it reports the program name and system
/// error on stderr and exits 127; it never returns into shell control flow.
pub fn launch(request: LaunchRequest, background: bool) -> Result<ChildHandle> {
    ensure!(!request.argv.is_empty(), "empty launch request");
    let argv: Vec<CString> = request
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<_, _>>()
        .context("argument contains a NUL byte")?;
    let fallback = request
        .fallback
        .as_deref()
        .map(CString::new)
        .transpose()
        .context("fallback program name contains a NUL byte")?;

    let started_at = Instant::now();
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => Ok(ChildHandle {
            pid: child,
            started_at,
            background,
        }),
        Ok(ForkResult::Child) => {
            exec_child(&argv, fallback.as_deref(), request.stdin, request.stdout)
        }
        Err(errno) => Err(anyhow::anyhow!("fork: {}", errno.desc())),
    }
    // Any Redirect::Fd still held by `request` is dropped here, closing the
    // parent's copy of the descriptor.
}

fn exec_child(argv: &[CString], fallback: Option<&CStr>, stdin: Redirect, stdout: Redirect) -> ! {
    if let Err(errno) = rewire(stdin, nix::libc::STDIN_FILENO) {
        fail(&argv[0], errno);
    }
    if let Err(errno) = rewire(stdout, nix::libc::STDOUT_FILENO) {
        fail(&argv[0], errno);
    }

    let mut errno = match unistd::execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };
    if let Some(fallback) = fallback {
        let mut fallback_argv = argv.to_vec();
        fallback_argv[0] = fallback.to_owned();
        errno = match unistd::execvp(fallback, &fallback_argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
    }
    fail(&argv[0], errno);
}

/// Duplicate a non-default descriptor onto stdin/stdout and close the
/// original, as the child side of a pipe expects.
fn rewire(redirect: Redirect, target: RawFd) -> nix::Result<()> {
    if let Redirect::Fd(fd) = redirect {
        let raw = fd.into_raw_fd();
        if raw != target {
            unistd::dup2(raw, target)?;
            let _ = unistd::close(raw);
        }
    }
    Ok(())
}

fn fail(program: &CStr, errno: Errno) -> ! {
    eprintln!("{}: {}", program.to_string_lossy(), errno.desc());
    process::exit(127);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::wait::{WaitStatus, waitpid};
    use std::fs::File;
    use std::io::Read;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn launch_records_pid_and_background_flag() {
        let handle = launch(LaunchRequest::new(argv(&["true"])), true).unwrap();
        assert!(handle.background);
        assert!(handle.pid.as_raw() > 0);
        let status = waitpid(handle.pid, None).unwrap();
        assert_eq!(status, WaitStatus::Exited(handle.pid, 0));
    }

    #[test]
    fn redirected_stdout_reaches_the_given_descriptor() {
        let (read_end, write_end) = unistd::pipe().unwrap();
        let request = LaunchRequest {
            argv: argv(&["echo", "hello"]),
            stdin: Redirect::Inherit,
            stdout: Redirect::Fd(write_end),
            fallback: None,
        };
        let handle = launch(request, false).unwrap();
        waitpid(handle.pid, None).unwrap();

        // The write end was closed in the parent when the request was
        // consumed, so this read terminates at end-of-input.
        let mut out = String::new();
        File::from(read_end).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn exec_failure_is_contained_to_the_child() {
        let handle = launch(
            LaunchRequest::new(argv(&["jobshell-no-such-program"])),
            false,
        )
        .unwrap();
        let status = waitpid(handle.pid, None).unwrap();
        assert_eq!(status, WaitStatus::Exited(handle.pid, 127));
    }

    #[test]
    fn fallback_program_is_tried_when_primary_is_missing() {
        let (read_end, write_end) = unistd::pipe().unwrap();
        let request = LaunchRequest {
            argv: argv(&["jobshell-no-such-pager", "fell back"]),
            stdin: Redirect::Inherit,
            stdout: Redirect::Fd(write_end),
            fallback: Some("echo".to_string()),
        };
        let handle = launch(request, false).unwrap();
        let status = waitpid(handle.pid, None).unwrap();
        assert_eq!(status, WaitStatus::Exited(handle.pid, 0));

        let mut out = String::new();
        File::from(read_end).read_to_string(&mut out).unwrap();
        assert_eq!(out, "fell back\n");
    }

    #[test]
    fn nul_byte_in_argument_is_a_launch_error() {
        let res = launch(LaunchRequest::new(vec!["e\0cho".to_string()]), false);
        assert!(res.is_err());
    }

    #[test]
    fn empty_argv_is_a_launch_error() {
        assert!(launch(LaunchRequest::new(Vec::new()), false).is_err());
    }
}
