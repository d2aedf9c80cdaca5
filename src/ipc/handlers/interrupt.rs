//! Interrupt handler: delivers Ctrl-C to the interpreter's terminal.

use serde_json::json;

use crate::ipc::router::{DispatchResponse, KernelContext};
use crate::types::Result;

/// Does not take the kernel lock: the cell being interrupted holds it.
pub fn handle<S>(ctx: &KernelContext<S>) -> Result<DispatchResponse> {
    let content = match &ctx.interrupter {
        Some(interrupter) => {
            interrupter.interrupt()?;
            tracing::info!("interrupt delivered to interpreter");
            json!({ "status": "ok" })
        }
        None => {
            tracing::warn!("interrupt requested but the session cannot be interrupted");
            json!({
                "status": "error",
                "ename": "NotSupported",
                "evalue": "this session cannot be interrupted",
                "traceback": [],
            })
        }
    };
    Ok(DispatchResponse::reply("interrupt_reply", content))
}
