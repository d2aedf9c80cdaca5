//! Request handlers, one module per concern.

pub mod interrupt;
pub mod kernel;
