//! Jupyter connection file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ipc::codec::Signer;
use crate::types::{Error, Result};

const HMAC_SHA256: &str = "hmac-sha256";

/// Ports, address and key written by the frontend that launched us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub ip: String,
    pub transport: String,
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    pub control_port: u16,
    pub hb_port: u16,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: String,
}

fn default_signature_scheme() -> String {
    HMAC_SHA256.to_string()
}

impl ConnectionInfo {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::not_found(format!("connection file {}: {}", path.display(), e))
        })?;
        let info: ConnectionInfo = serde_json::from_str(&raw)?;
        info.validate()?;
        Ok(info)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transport != "tcp" && self.transport != "ipc" {
            return Err(Error::validation(format!(
                "unsupported transport: {}",
                self.transport
            )));
        }
        if !self.key.is_empty() && self.signature_scheme != HMAC_SHA256 {
            return Err(Error::validation(format!(
                "unsupported signature scheme: {}",
                self.signature_scheme
            )));
        }
        Ok(())
    }

    /// ZeroMQ endpoint for one of the ports in this file.
    pub fn endpoint(&self, port: u16) -> String {
        match self.transport.as_str() {
            "ipc" => format!("ipc://{}-{}", self.ip, port),
            _ => format!("{}://{}:{}", self.transport, self.ip, port),
        }
    }

    pub fn signer(&self) -> Signer {
        Signer::new(&self.key)
    }
}
