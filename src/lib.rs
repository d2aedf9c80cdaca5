//! # MCore Kernel - Jupyter kernel for the Miking MCore language
//!
//! Hosts one long-lived `mi repl --no-line-edit` under a pseudo-terminal and
//! exposes it to Jupyter frontends:
//! - Each cell is sent as a `:{` ... `:}` block so multi-line input is
//!   treated as one unit by the interpreter
//! - Everything the interpreter prints before its next prompt becomes the
//!   cell's stdout stream
//! - Bindings persist across cells because the interpreter does
//!
//! ## Architecture
//!
//! ```text
//!   shell / control  ─┐
//!   (ROUTER)          │   ┌──────────┐   ┌─────────────┐   ┌──────────┐
//!                     ├──▶│  router  │──▶│   Kernel    │──▶│  repl    │──▶ mi repl
//!   heartbeat (REP)   │   └──────────┘   │ (adapter)   │   │ (pty)    │
//!                     │        │         └─────────────┘   └──────────┘
//!   iopub (PUB)  ◀────┴── publisher ◀── stream / error / status
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod ipc;
pub mod kernel;
pub mod kernelspec;
pub mod repl;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
