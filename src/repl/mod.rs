//! Interactive interpreter control.
//!
//! [`PtyProcess`] owns the child and its pseudo-terminal; [`ReplWrapper`]
//! layers prompt-driven command execution on top. The kernel only sees the
//! [`ReplSession`] seam.

pub mod pty;
pub mod wrapper;

pub use pty::{Interrupter, PtyProcess, PtySpawnSpec};
pub use wrapper::ReplWrapper;

use crate::types::Result;

/// A running interpreter that accepts one command at a time.
#[cfg_attr(test, mockall::automock)]
pub trait ReplSession: Send {
    /// Send `command` and block until the interpreter is back at its primary
    /// prompt. Returns everything printed in between.
    fn run_command(&mut self, command: &str) -> Result<String>;
}
