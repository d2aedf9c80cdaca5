//! Jupyter wire protocol over ZeroMQ.
//!
//! Five sockets per the connection file: shell, control and stdin (ROUTER),
//! iopub (PUB) and heartbeat (REP). Frames are HMAC-signed as described in
//! the messaging spec, version 5.3.

pub mod codec;
pub mod connection;
pub mod handlers;
pub mod message;
pub mod publisher;
pub mod router;
pub mod server;

pub use connection::ConnectionInfo;
pub use message::{Header, Message};
pub use server::KernelServer;
