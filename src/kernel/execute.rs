//! Execute request/reply types and the output sink seam.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Error;

/// Opens a multi-statement block in the MCore REPL.
pub const OPEN_MARKER: &str = ":{";
/// Closes a multi-statement block in the MCore REPL.
pub const CLOSE_MARKER: &str = ":}";

/// Wrap cell source in the block delimiters, one marker per line.
pub fn wrap_code(code: &str) -> String {
    format!("{OPEN_MARKER}\n{code}\n{CLOSE_MARKER}")
}

/// Content of an `execute_request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// Suppress output on iopub.
    #[serde(default)]
    pub silent: bool,
    #[serde(default = "default_true")]
    pub store_history: bool,
    #[serde(default)]
    pub user_expressions: Map<String, Value>,
    /// Interactive input is unsupported; accepted and ignored.
    #[serde(default)]
    pub allow_stdin: bool,
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
}

fn default_true() -> bool {
    true
}

impl ExecuteRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            silent: false,
            store_history: true,
            user_expressions: Map::new(),
            allow_stdin: false,
            stop_on_error: true,
        }
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Content of an `execute_reply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecuteReply {
    Ok {
        execution_count: u32,
        payload: Vec<Value>,
        user_expressions: Map<String, Value>,
    },
    Error {
        execution_count: u32,
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

impl ExecuteReply {
    pub fn ok(execution_count: u32) -> Self {
        Self::Ok {
            execution_count,
            payload: Vec::new(),
            user_expressions: Map::new(),
        }
    }

    pub fn error(execution_count: u32, error: ExecutionError) -> Self {
        Self::Error {
            execution_count,
            ename: error.ename,
            evalue: error.evalue,
            traceback: error.traceback,
        }
    }

    pub fn execution_count(&self) -> u32 {
        match self {
            Self::Ok { execution_count, .. } | Self::Error { execution_count, .. } => {
                *execution_count
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Failure details shared by `execute_reply` and the iopub `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub ename: String,
    pub evalue: String,
    pub traceback: Vec<String>,
}

impl From<&Error> for ExecutionError {
    fn from(error: &Error) -> Self {
        let ename = error.ename().to_string();
        let evalue = error.to_string();
        Self {
            traceback: vec![format!("{ename}: {evalue}")],
            ename,
            evalue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

/// Output produced while executing a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelEvent {
    Stream { name: StreamName, text: String },
    Error(ExecutionError),
}

/// Where the kernel sends output events. The hosting layer publishes them
/// on iopub; tests collect them.
pub trait OutputSink {
    fn emit(&mut self, event: KernelEvent);
}

impl OutputSink for Vec<KernelEvent> {
    fn emit(&mut self, event: KernelEvent) {
        self.push(event);
    }
}
