//! Shell request handlers: kernel info, execution and the fixed-answer
//! introspection requests.

use serde_json::{json, Value};
use std::sync::atomic::Ordering;

use crate::ipc::message::Message;
use crate::ipc::publisher::IopubSink;
use crate::ipc::router::{DispatchResponse, KernelContext};
use crate::kernel::ExecuteRequest;
use crate::repl::ReplSession;
use crate::types::{Error, Result};

pub fn kernel_info<S>(ctx: &KernelContext<S>) -> DispatchResponse {
    let mut content = serde_json::to_value(&ctx.info).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut content {
        map.insert("status".to_string(), json!("ok"));
    }
    DispatchResponse::reply("kernel_info_reply", content)
}

/// Run one cell on a blocking worker and reply with its outcome.
///
/// The counter is bumped before running, and only for non-silent requests.
pub async fn execute<S: ReplSession + 'static>(
    ctx: &KernelContext<S>,
    request: &Message,
) -> Result<DispatchResponse> {
    let execute: ExecuteRequest = serde_json::from_value(request.content.clone())
        .map_err(|e| Error::validation(format!("invalid execute_request: {}", e)))?;

    let execution_count = if execute.silent {
        ctx.execution_count.load(Ordering::SeqCst)
    } else {
        let count = ctx.execution_count.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.publisher
            .execute_input(&request.header, &execute.code, count);
        count
    };

    let kernel = ctx.kernel.clone();
    let mut sink = IopubSink::new(ctx.publisher.clone(), request.header.clone());
    let reply = tokio::task::spawn_blocking(move || {
        let mut kernel = kernel.blocking_lock();
        kernel.execute(&execute, execution_count, &mut sink)
    })
    .await
    .map_err(|e| Error::internal(format!("execute worker failed: {}", e)))?;

    Ok(DispatchResponse::reply(
        "execute_reply",
        serde_json::to_value(&reply)?,
    ))
}

pub fn shutdown(request: &Message) -> DispatchResponse {
    let restart = request
        .content
        .get("restart")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    tracing::info!(restart, "shutdown requested");
    DispatchResponse::Shutdown {
        content: json!({ "status": "ok", "restart": restart }),
    }
}

/// The kernel cannot judge MCore syntax.
pub fn is_complete() -> DispatchResponse {
    DispatchResponse::reply("is_complete_reply", json!({ "status": "unknown" }))
}

pub fn complete(request: &Message) -> DispatchResponse {
    let cursor_pos = request
        .content
        .get("cursor_pos")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    DispatchResponse::reply(
        "complete_reply",
        json!({
            "status": "ok",
            "matches": [],
            "cursor_start": cursor_pos,
            "cursor_end": cursor_pos,
            "metadata": {},
        }),
    )
}

pub fn inspect() -> DispatchResponse {
    DispatchResponse::reply(
        "inspect_reply",
        json!({ "status": "ok", "found": false, "data": {}, "metadata": {} }),
    )
}

pub fn history() -> DispatchResponse {
    DispatchResponse::reply("history_reply", json!({ "status": "ok", "history": [] }))
}

pub fn comm_info() -> DispatchResponse {
    DispatchResponse::reply("comm_info_reply", json!({ "status": "ok", "comms": {} }))
}
