//! Jupyter message model.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::kernel::PROTOCOL_VERSION;
use crate::types::{MessageId, SessionId};

const USERNAME: &str = "kernel";

/// Message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub msg_id: MessageId,
    #[serde(default)]
    pub session: SessionId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub date: String,
    pub msg_type: String,
    #[serde(default)]
    pub version: String,
}

impl Header {
    pub fn new(msg_type: impl Into<String>, session: &SessionId) -> Self {
        Self {
            msg_id: MessageId::new(),
            session: session.clone(),
            username: USERNAME.to_string(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            msg_type: msg_type.into(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

/// A decoded message. `identities` are the routing frames in front of the
/// delimiter (ROUTER peer ids, or the iopub topic).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub identities: Vec<Bytes>,
    pub header: Header,
    pub parent_header: Value,
    pub metadata: Value,
    pub content: Value,
    pub buffers: Vec<Bytes>,
}

impl Message {
    pub fn new(msg_type: &str, session: &SessionId, content: Value) -> Self {
        Self {
            identities: Vec::new(),
            header: Header::new(msg_type, session),
            parent_header: json!({}),
            metadata: json!({}),
            content,
            buffers: Vec::new(),
        }
    }

    /// Reply routed back to the sender of `self`.
    pub fn reply(&self, msg_type: &str, session: &SessionId, content: Value) -> Self {
        Self {
            identities: self.identities.clone(),
            parent_header: self.header.to_value(),
            ..Self::new(msg_type, session, content)
        }
    }

    /// Broadcast on iopub, attributed to `parent` when given.
    pub fn broadcast(
        msg_type: &str,
        session: &SessionId,
        parent: Option<&Header>,
        content: Value,
    ) -> Self {
        Self {
            identities: vec![Bytes::from(format!("kernel.{}.{}", session, msg_type))],
            parent_header: parent.map_or_else(|| json!({}), Header::to_value),
            ..Self::new(msg_type, session, content)
        }
    }

    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_links_parent() {
        let session = SessionId::new();
        let mut request = Message::new("execute_request", &SessionId::new(), json!({"code": "1"}));
        request.identities = vec![Bytes::from_static(b"peer")];

        let reply = request.reply("execute_reply", &session, json!({"status": "ok"}));

        assert_eq!(reply.identities, request.identities);
        assert_eq!(reply.parent_header["msg_id"], request.header.msg_id.as_str());
        assert_eq!(reply.parent_header["msg_type"], "execute_request");
        assert_eq!(reply.header.session, session);
        assert_eq!(reply.header.version, "5.3");
        assert_ne!(reply.header.msg_id, request.header.msg_id);
    }

    #[test]
    fn test_broadcast_topic_and_parent() {
        let session = SessionId::new();
        let status = Message::broadcast("status", &session, None, json!({"execution_state": "starting"}));
        assert_eq!(status.parent_header, json!({}));
        assert_eq!(
            status.identities,
            vec![Bytes::from(format!("kernel.{}.status", session))]
        );
    }

    #[test]
    fn test_header_accepts_minimal_fields() {
        let header: Header =
            serde_json::from_value(json!({"msg_id": "m1", "msg_type": "kernel_info_request"}))
                .unwrap();
        assert_eq!(header.msg_id.as_str(), "m1");
        assert_eq!(header.msg_type, "kernel_info_request");
    }
}
