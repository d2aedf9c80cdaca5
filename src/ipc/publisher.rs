//! IOPub side channel: status, execute_input, stream and error broadcasts.
//!
//! Handlers (including the blocking execute worker) hand messages to an
//! unbounded channel; a single task owns the PUB socket and drains it, which
//! keeps broadcasts in submission order.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::ipc::message::{Header, Message};
use crate::kernel::{KernelEvent, OutputSink};
use crate::types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Starting,
    Busy,
    Idle,
}

#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::UnboundedSender<Message>,
    session: SessionId,
}

impl Publisher {
    pub fn new(tx: mpsc::UnboundedSender<Message>, session: SessionId) -> Self {
        Self { tx, session }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn publish(&self, parent: Option<&Header>, msg_type: &str, content: serde_json::Value) {
        let message = Message::broadcast(msg_type, &self.session, parent, content);
        if self.tx.send(message).is_err() {
            tracing::debug!(msg_type, "iopub closed, dropping broadcast");
        }
    }

    pub fn status(&self, parent: Option<&Header>, state: ExecutionState) {
        self.publish(parent, "status", json!({ "execution_state": state }));
    }

    pub fn execute_input(&self, parent: &Header, code: &str, execution_count: u32) {
        self.publish(
            Some(parent),
            "execute_input",
            json!({ "code": code, "execution_count": execution_count }),
        );
    }
}

/// Publishes kernel output attributed to one request.
#[derive(Debug)]
pub struct IopubSink {
    publisher: Publisher,
    parent: Header,
}

impl IopubSink {
    pub fn new(publisher: Publisher, parent: Header) -> Self {
        Self { publisher, parent }
    }
}

impl OutputSink for IopubSink {
    fn emit(&mut self, event: KernelEvent) {
        match event {
            KernelEvent::Stream { name, text } => self.publisher.publish(
                Some(&self.parent),
                "stream",
                json!({ "name": name, "text": text }),
            ),
            KernelEvent::Error(error) => self.publisher.publish(
                Some(&self.parent),
                "error",
                json!({
                    "ename": error.ename,
                    "evalue": error.evalue,
                    "traceback": error.traceback,
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{ExecutionError, StreamName};

    #[test]
    fn test_sink_publishes_stream_with_parent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let publisher = Publisher::new(tx, SessionId::new());
        let parent = Header::new("execute_request", &SessionId::new());
        let mut sink = IopubSink::new(publisher, parent.clone());

        sink.emit(KernelEvent::Stream {
            name: StreamName::Stdout,
            text: "5\n".to_string(),
        });

        let message = rx.try_recv().unwrap();
        assert_eq!(message.msg_type(), "stream");
        assert_eq!(message.content, json!({"name": "stdout", "text": "5\n"}));
        assert_eq!(message.parent_header["msg_id"], parent.msg_id.as_str());
    }

    #[test]
    fn test_sink_publishes_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = IopubSink::new(
            Publisher::new(tx, SessionId::new()),
            Header::new("execute_request", &SessionId::new()),
        );

        sink.emit(KernelEvent::Error(ExecutionError {
            ename: "ReplTimeout".to_string(),
            evalue: "timeout".to_string(),
            traceback: vec!["ReplTimeout: timeout".to_string()],
        }));

        let message = rx.try_recv().unwrap();
        assert_eq!(message.msg_type(), "error");
        assert_eq!(message.content["ename"], "ReplTimeout");
    }

    #[test]
    fn test_status_after_close_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let publisher = Publisher::new(tx, SessionId::new());
        publisher.status(None, ExecutionState::Idle);
    }
}
