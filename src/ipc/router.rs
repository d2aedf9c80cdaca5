//! Top-level router: routes by channel and msg_type, delegates to handlers.

use serde_json::Value;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ipc::handlers;
use crate::ipc::message::Message;
use crate::ipc::publisher::Publisher;
use crate::kernel::{Kernel, KernelInfo};
use crate::repl::{Interrupter, ReplSession};
use crate::types::Result;

/// The ROUTER socket a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Shell,
    Control,
}

/// Result from dispatching a request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResponse {
    /// Send `content` back as `msg_type`.
    Reply { msg_type: String, content: Value },
    /// Reply, then stop serving.
    Shutdown { content: Value },
    /// Nothing to send.
    Ignored,
}

impl DispatchResponse {
    pub fn reply(msg_type: &str, content: Value) -> Self {
        Self::Reply {
            msg_type: msg_type.to_string(),
            content,
        }
    }
}

/// State shared by the shell and control loops.
#[derive(Debug)]
pub struct KernelContext<S> {
    pub kernel: Arc<Mutex<Kernel<S>>>,
    /// Read without the kernel lock so control requests stay answerable
    /// during an execution.
    pub info: KernelInfo,
    pub interrupter: Option<Interrupter>,
    pub publisher: Publisher,
    pub execution_count: AtomicU32,
}

impl<S: ReplSession> KernelContext<S> {
    pub fn new(kernel: Kernel<S>, interrupter: Option<Interrupter>, publisher: Publisher) -> Self {
        let info = kernel.info();
        Self {
            kernel: Arc::new(Mutex::new(kernel)),
            info,
            interrupter,
            publisher,
            execution_count: AtomicU32::new(0),
        }
    }
}

/// Route a decoded request to the appropriate handler.
pub async fn route_request<S: ReplSession + 'static>(
    channel: Channel,
    ctx: &KernelContext<S>,
    request: &Message,
) -> Result<DispatchResponse> {
    match (channel, request.msg_type()) {
        (_, "kernel_info_request") => Ok(handlers::kernel::kernel_info(ctx)),
        (_, "shutdown_request") => Ok(handlers::kernel::shutdown(request)),
        (Channel::Control, "interrupt_request") => handlers::interrupt::handle(ctx),
        (Channel::Shell, "execute_request") => handlers::kernel::execute(ctx, request).await,
        (Channel::Shell, "is_complete_request") => Ok(handlers::kernel::is_complete()),
        (Channel::Shell, "complete_request") => Ok(handlers::kernel::complete(request)),
        (Channel::Shell, "inspect_request") => Ok(handlers::kernel::inspect()),
        (Channel::Shell, "history_request") => Ok(handlers::kernel::history()),
        (Channel::Shell, "comm_info_request") => Ok(handlers::kernel::comm_info()),
        (channel, other) => {
            tracing::warn!(?channel, msg_type = other, "unknown message type, ignoring");
            Ok(DispatchResponse::Ignored)
        }
    }
}
