use anyhow::{Context, Result};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, sigprocmask};

/// Blocks `SIGCHLD` for the calling process until dropped.
///
/// The shell holds one of these across every foreground fork/wait pair so a
/// termination notification for the awaited child can never be intercepted
/// out from under the explicit wait. Dropping the gate unblocks the signal,
/// which keeps the block/unblock pairing intact on every exit path, early
/// returns included. Gates are not nested; the shell holds at most one at a
/// time.
#[derive(Debug)]
pub struct SignalGate {
    set: SigSet,
}

impl SignalGate {
    /// Block `SIGCHLD` until the returned gate is dropped.
    pub fn block() -> Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)
            .context("sigprocmask(SIG_BLOCK)")?;
        Ok(Self { set })
    }
}

impl Drop for SignalGate {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None);
    }
}
