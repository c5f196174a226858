//! A tiny interactive job-control shell engine.
//!
//! One command line is read per iteration and dispatched either to a built-in
//! (`cd`, `exit`, `checkEnv`) or to an external program launched as a child
//! process. Foreground children are waited for synchronously under a SIGCHLD
//! block/unblock gate; background children (trailing `&`) are collected by a
//! non-blocking reap sweep on every loop iteration, so a completion
//! notification for one child can never corrupt the explicit wait for
//! another. The `checkEnv` built-in chains a fixed pipeline of external
//! stages through anonymous pipes.
//!
//! The main entry point is [`Interpreter`]; see [`Interpreter::repl`] for the
//! interactive loop and [`Interpreter::run_line`] for one-shot dispatch.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod parser;
mod pipeline;
mod signal;

pub use interpreter::{Interpreter, Status};
pub use signal::SignalGate;
